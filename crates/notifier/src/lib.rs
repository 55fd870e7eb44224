pub mod dispatcher;
pub mod email;
pub mod provider;
pub mod twilio;
pub mod voice;
pub mod whatsapp;

pub use dispatcher::{DispatchJob, Dispatcher, ProviderSet};
pub use provider::{NotificationProvider, ProviderError, Recipient, RenderedMessage};
