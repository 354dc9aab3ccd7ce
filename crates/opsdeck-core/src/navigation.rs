//! Sign-in redirect port
//!
//! Invoked when the session cannot be recovered (no refresh token, or the
//! refresh itself failed). The dashboard implementation navigates to the
//! credential entry page; headless hosts publish an event instead.

use crate::domain::SessionEvent;
use crate::event_bus::EventSender;

pub trait SignInRedirect: Send + Sync {
    fn redirect_to_sign_in(&self);
}

impl SignInRedirect for EventSender {
    fn redirect_to_sign_in(&self) {
        self.emit(SessionEvent::SignInRequired);
    }
}
