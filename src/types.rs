use std::sync::Arc;
use tokio::sync::{mpsc::Sender, Mutex};

use crate::clock::Clock;
use crate::notify::{Notifier, ToastBoard};
use crate::schedule::ScheduleManager;
use crate::store::KeyValueStore;
use crate::timing::ReminderPoller;

/// The only writer of the stored schedule. Held for the whole of a pop.
pub type SharedManager = Arc<Mutex<ScheduleManager>>;

/// Also serializes settings changes: hold it across save, reset and re-arm.
pub type SharedPoller = Arc<Mutex<ReminderPoller>>;

/// `true` asks a polling loop to stop.
pub type CancelSender = Sender<bool>;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn KeyValueStore>,
    pub clock: Arc<dyn Clock>,
    pub manager: SharedManager,
    pub poller: SharedPoller,
    pub notifier: Arc<dyn Notifier>,
    pub toasts: Arc<ToastBoard>,
}

impl AppState {
    pub fn new(store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        poll_interval: tokio::time::Duration) -> AppState {

        let manager: SharedManager = Arc::new(Mutex::new(ScheduleManager::new(Arc::clone(&store), Arc::clone(&clock))));
        let toasts = Arc::new(ToastBoard::new());
        let poller = ReminderPoller::new(Arc::clone(&manager), Arc::clone(&notifier), Arc::clone(&toasts), poll_interval);

        AppState {
            store,
            clock,
            manager,
            poller: Arc::new(Mutex::new(poller)),
            notifier,
            toasts,
        }
    }
}
