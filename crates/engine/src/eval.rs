//! The evaluator — a trampolined interpreter over Forms.
//!
//! One form at a time, awaiting each effect, with an explicit pending
//! queue for `Seq` tails so arbitrarily long chains never grow the native
//! stack. Cancellation is checked at every entry; a fired token raises
//! [`EngineError::Aborted`].

use gloop_core::{Effects, EngineError, Form, World};
use tracing::debug;

use crate::invoke::invoke_step;
use crate::think::think_step;

/// Evaluate `form` to completion against the given world and effects.
///
/// Terminal forms (`Nil`, `Done`, `Refresh`, `Reboot`, `Install`,
/// `ListTools`) end the run; everything else computes a successor and the
/// loop continues.
pub async fn eval(form: Form, world: &World, effects: &dyn Effects) -> Result<(), EngineError> {
    let mut current = form;
    let mut pending: Vec<Form> = Vec::new();

    loop {
        if world.cancel.is_cancelled() {
            return Err(EngineError::Aborted);
        }
        debug!(form = current.tag(), pending = pending.len(), "eval");

        current = match current {
            Form::Nil => match pending.pop() {
                Some(next) => next,
                None => return Ok(()),
            },

            Form::Done { summary } => {
                effects.complete(&summary).await;
                return Ok(());
            }

            Form::Emit { text, then } => {
                effects.stream_chunk(&text).await;
                effects.stream_done().await;
                *then
            }

            Form::Remember { content, then } => {
                effects.remember(&content).await?;
                *then
            }

            Form::Forget { content, then } => {
                effects.forget(&content).await?;
                *then
            }

            Form::Confirm { command, then } => {
                let approved = effects.confirm(&command).await?;
                then(approved)
            }

            Form::Ask { question, then } => {
                let answer = effects.ask(&question).await?;
                then(answer)
            }

            Form::Refresh => {
                effects.refresh_system().await?;
                return Ok(());
            }

            Form::Reboot { reason } => {
                // Never returns from a real implementation; a save failure
                // propagates and the process keeps running.
                effects.reboot(&reason, &world.conversation).await?;
                return Ok(());
            }

            Form::Seq(forms) => {
                pending.extend(forms.into_iter().rev());
                pending.pop().unwrap_or(Form::Nil)
            }

            Form::Think { input } => think_step(&input, world, effects).await?,

            Form::Invoke { calls, then } => {
                let results = invoke_step(calls, world, effects).await?;
                then(results)
            }

            Form::Install { source } => {
                let message = effects.install_tool(&source).await?;
                effects.stream_chunk(&message).await;
                effects.stream_done().await;
                return Ok(());
            }

            Form::ListTools => {
                let listing = effects.list_tools().await?;
                effects.stream_chunk(&listing).await;
                effects.stream_done().await;
                return Ok(());
            }

            Form::Spawn { task, then } => {
                let result = effects.spawn(&task).await?;
                then(result)
            }
        };
    }
}
