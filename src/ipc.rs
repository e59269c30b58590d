//! Daemon process: control socket, gesture pipeline and binding dispatch.

mod dispatch;
mod pipeline;
mod runtime;
mod server;
mod watch;

pub use dispatch::dispatch_gesture;
pub use runtime::socket_path;
pub use server::{client_request, run_daemon};

use std::sync::{Arc, Mutex};

use crate::config::Profile;
use crate::gestures::GestureContext;

/// Settings shared between the control loop and the pipeline thread.
/// Each half carries a revision so the pipeline only rebuilds what changed.
#[derive(Debug)]
pub struct Settings {
    pub profile: Profile,
    pub profile_rev: u64,
    pub context: GestureContext,
    pub context_rev: u64,
}

pub type SharedSettings = Arc<Mutex<Settings>>;

impl Settings {
    pub fn new(profile: Profile) -> Self {
        let context = profile.initial_context();
        Self {
            profile,
            profile_rev: 0,
            context,
            context_rev: 0,
        }
    }

    pub fn replace_profile(&mut self, profile: Profile) {
        self.profile = profile;
        self.profile_rev += 1;
    }

    pub fn set_context(&mut self, context: GestureContext) {
        if context != self.context {
            self.context = context;
            self.context_rev += 1;
        }
    }
}
