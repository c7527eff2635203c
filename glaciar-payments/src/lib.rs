pub mod gateway;
pub mod reconciler;
pub mod signature;
pub mod status_text;

pub use gateway::MercadoPagoClient;
pub use reconciler::{PaymentNotification, WebhookAck, WebhookReconciler};
pub use signature::SignatureParts;
