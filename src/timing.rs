use std::sync::Arc;
use log::{debug, info, warn};
use tokio::{sync::mpsc, task::JoinHandle, time::Duration};

use crate::models::{Settings, Timestamp};
use crate::notify::{reminder_alert, Notifier, Permission, ToastBoard, TOAST_REMINDER};
use crate::types::{CancelSender, SharedManager};

/// How long `stop` waits for a tick in progress before aborting it.
pub const STOP_GRACE: Duration = Duration::from_secs(5);

/// Owns the single polling task. Re-arming always stops the previous loop first.
pub struct ReminderPoller {
    manager: SharedManager,
    notifier: Arc<dyn Notifier>,
    toasts: Arc<ToastBoard>,
    interval: Duration,
    running: Option<(CancelSender, JoinHandle<()>)>,
}

impl ReminderPoller {
    pub fn new(manager: SharedManager,
        notifier: Arc<dyn Notifier>,
        toasts: Arc<ToastBoard>,
        interval: Duration) -> ReminderPoller {

        ReminderPoller { manager, notifier, toasts, interval, running: None }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub async fn arm(&mut self, settings: Settings) {
        self.stop().await;
        if !settings.notifications_enabled {
            debug!("poller:: notifications disabled, not arming");
            return;
        }

        self.manager.lock().await.ensure_today_schedule(&settings);

        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(
            start_polling_loop(
                settings,
                Arc::clone(&self.manager),
                Arc::clone(&self.notifier),
                Arc::clone(&self.toasts),
                self.interval,
                rx,
            )
        );
        self.running = Some((tx, handle));
        info!("poller:: armed, polling every {:?}", self.interval);
    }

    /// Returns once the loop has exited; no pop happens after this. A tick
    /// stuck in delivery for longer than `STOP_GRACE` is aborted.
    pub async fn stop(&mut self) {
        let Some((cancel, mut handle)) = self.running.take() else {
            return;
        };
        cancel.send(true).await.ok();

        match tokio::time::timeout(STOP_GRACE, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("poller:: polling loop ended abnormally: {e}"),
            Err(_) => {
                warn!("poller:: polling loop still busy after {:?}, aborting", STOP_GRACE);
                handle.abort();
                handle.await.ok();
            }
        }
        debug!("poller:: stopped");
    }
}

pub async fn start_polling_loop(settings: Settings,
    manager: SharedManager,
    notifier: Arc<dyn Notifier>,
    toasts: Arc<ToastBoard>,
    interval: Duration,
    mut cancel: mpsc::Receiver<bool>) {

    loop {
        let sleep_handle = tokio::time::sleep(interval);
        let cancel_handle = cancel.recv();

        tokio::select! {
            _ = sleep_handle => {}
            _ = cancel_handle => {
                debug!("polling_loop:: canceled");
                break;
            }
        }

        let due = {
            let mut manager = manager.lock().await;
            // a process left running past midnight picks up the new day here
            manager.ensure_today_schedule(&settings);
            let now = manager.now_ms();
            manager.pop_due_notifications(now).due
        };

        deliver_due(&due, notifier.as_ref(), &toasts).await;
    }
}

/// One notification per due reminder, in order. Without permission each one
/// falls back to the in-app toast.
pub async fn deliver_due(due: &[Timestamp], notifier: &dyn Notifier, toasts: &ToastBoard) {
    if due.is_empty() {
        return;
    }
    debug!("polling_loop:: delivering {} reminders", due.len());

    for time in due {
        if notifier.permission() == Permission::Granted {
            debug!("polling_loop:: firing reminder scheduled at {}", time);
            notifier.fire(&reminder_alert(*time)).await;
        } else {
            toasts.post(TOAST_REMINDER);
        }
    }
}
