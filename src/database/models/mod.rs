pub mod enums;
pub mod profile;
pub mod session;

pub use enums::{
    BillingInterval, NotificationType, OrderPaymentStatus, OrderStatus, PaymentProvider, PaymentStatus, Role,
    StringEnum, SubscriptionStatus, TicketPriority, TicketStatus,
};
pub use profile::Profile;
pub use session::{mask_token, parse_timestamp, UserSession};
