//! Unit tests for the work queue.


use crate::integration::domain::IntegrationId;
use crate::notification::domain::{NotificationEvent, NotificationTarget, OutboundNotification};
use crate::queue::domain::Job;
use crate::task::domain::TaskId;

fn notification_job(title: &str) -> Job {
    Job::DispatchNotification(OutboundNotification::new(
        IntegrationId::new(),
        NotificationEvent::TaskCreated {
            task_id: TaskId::new(),
            title: title.to_owned(),
        },
        NotificationTarget::Recipient("G-crew".to_owned()),
    ))
}
