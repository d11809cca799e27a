use serde::{Deserialize, Serialize};

/// Closed set of string values stored in a text column
pub trait StringEnum: Sized + Copy + 'static {
    const VALUES: &'static [&'static str];

    fn as_str(&self) -> &'static str;

    fn parse(value: &str) -> Option<Self>;
}

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl StringEnum for $name {
            const VALUES: &'static [&'static str] = &[$($value),+];

            fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }

            fn parse(value: &str) -> Option<Self> {
                match value {
                    $($value => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(
    /// Account role on a profile
    Role {
        Merchant => "merchant",
        Customer => "customer",
        Admin => "admin",
    }
);

string_enum!(OrderStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

string_enum!(
    /// `orders.payment_status`
    OrderPaymentStatus {
        Pending => "pending",
        Paid => "paid",
        Partial => "partial",
        Failed => "failed",
        Refunded => "refunded",
    }
);

string_enum!(
    /// Mobile money operators and other settlement channels
    PaymentProvider {
        OrangeMoney => "orange_money",
        Wave => "wave",
        MtnMomo => "mtn_momo",
        MoovMoney => "moov_money",
        FreeMoney => "free_money",
        Cash => "cash",
        Card => "card",
        BankTransfer => "bank_transfer",
    }
);

string_enum!(
    /// `payments.status`
    PaymentStatus {
        Pending => "pending",
        Completed => "completed",
        Failed => "failed",
        Refunded => "refunded",
        Cancelled => "cancelled",
    }
);

string_enum!(BillingInterval {
    Monthly => "monthly",
    Yearly => "yearly",
});

string_enum!(SubscriptionStatus {
    Trial => "trial",
    Active => "active",
    PastDue => "past_due",
    Cancelled => "cancelled",
    Expired => "expired",
});

string_enum!(TicketStatus {
    Open => "open",
    InProgress => "in_progress",
    Resolved => "resolved",
    Closed => "closed",
});

string_enum!(TicketPriority {
    Low => "low",
    Medium => "medium",
    High => "high",
    Urgent => "urgent",
});

string_enum!(NotificationType {
    Order => "order",
    Payment => "payment",
    System => "system",
    Subscription => "subscription",
    Support => "support",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_prints_wire_values() {
        assert_eq!(PaymentProvider::parse("orange_money"), Some(PaymentProvider::OrangeMoney));
        assert_eq!(SubscriptionStatus::PastDue.as_str(), "past_due");
        assert_eq!(Role::parse("superuser"), None);
        assert_eq!(TicketStatus::VALUES.len(), 4);
    }

    #[test]
    fn serde_uses_snake_case_values() {
        let v = serde_json::to_value(TicketStatus::InProgress).unwrap();
        assert_eq!(v, serde_json::json!("in_progress"));
        let r: Role = serde_json::from_value(serde_json::json!("admin")).unwrap();
        assert_eq!(r, Role::Admin);
    }
}
