//! Routes button and form callbacks back into the workflows.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::reply::Reply;
use super::schedule::ScheduleWorkflow;
use super::task::TaskWorkflow;
use crate::session::{CallbackAction, CallbackId};

/// Decodes callback ids and invokes the matching workflow operation.
#[derive(Clone)]
pub struct Dispatcher {
    schedule: Arc<ScheduleWorkflow>,
    tasks: Arc<TaskWorkflow>,
}

impl Dispatcher {
    pub fn new(schedule: Arc<ScheduleWorkflow>, tasks: Arc<TaskWorkflow>) -> Self {
        Self { schedule, tasks }
    }

    fn decode(callback_id: &str) -> Option<CallbackId> {
        match callback_id.parse::<CallbackId>() {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(callback_id, error = %e, "unreadable callback id");
                None
            }
        }
    }

    /// A button was pressed.
    ///
    /// An unreadable id, like an unknown session, reads as an expired
    /// session.
    pub async fn on_button_activated(&self, user_id: &str, callback_id: &str) -> Reply {
        let Some(id) = Self::decode(callback_id) else {
            return Reply::session_expired();
        };
        debug!(action = id.action.as_str(), session_id = %id.session_id, index = id.index, "button activated");

        match id.action {
            CallbackAction::ScheduleDelete => {
                self.schedule
                    .execute_delete(user_id, &id.session_id, id.index)
                    .await
            }
            CallbackAction::ScheduleCancel => self.schedule.cancel(user_id, &id.session_id),
            CallbackAction::ScheduleEdit => {
                self.schedule
                    .open_edit_form(user_id, &id.session_id, id.index)
            }
            CallbackAction::TaskComplete => {
                self.tasks
                    .execute_complete(user_id, &id.session_id, id.index)
                    .await
            }
            CallbackAction::TaskCancel => self.tasks.cancel(user_id, &id.session_id),
            CallbackAction::ScheduleUpdate => {
                warn!("edit form callback arrived as a button");
                Reply::session_expired()
            }
        }
    }

    /// A form was submitted.
    pub async fn on_form_submitted(
        &self,
        user_id: &str,
        callback_id: &str,
        fields: &HashMap<String, String>,
    ) -> Reply {
        let Some(id) = Self::decode(callback_id) else {
            return Reply::session_expired();
        };
        debug!(action = id.action.as_str(), session_id = %id.session_id, "form submitted");

        match id.action {
            CallbackAction::ScheduleUpdate => {
                self.schedule
                    .execute_update(user_id, &id.session_id, id.index, fields)
                    .await
            }
            other => {
                warn!(action = other.as_str(), "button callback arrived as a form");
                Reply::session_expired()
            }
        }
    }
}
