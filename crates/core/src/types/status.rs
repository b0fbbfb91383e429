//! Order enums.
//!
//! Both enums are stored as `TEXT` columns guarded by `CHECK` constraints,
//! using the snake-case spellings returned by [`OrderStatus::as_str`] and
//! [`BuyingType::as_str`].

use serde::{Deserialize, Serialize};

/// Error returned when a string names no known variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

/// Order processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Just placed; nobody has looked at it yet.
    #[default]
    New,
    /// A manager is assembling the order.
    InProgress,
    /// Ready for pickup or dispatch.
    #[serde(rename = "is_ready")]
    Ready,
    /// Handed over to the customer.
    Completed,
}

impl OrderStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 4] = [Self::New, Self::InProgress, Self::Ready, Self::Completed];

    /// Stored spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::Ready => "is_ready",
            Self::Completed => "completed",
        }
    }

    /// Human-readable label for templates.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::New => "New order",
            Self::InProgress => "In progress",
            Self::Ready => "Ready",
            Self::Completed => "Completed",
        }
    }
}

/// How the customer receives the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BuyingType {
    /// Customer picks the order up.
    #[default]
    #[serde(rename = "self")]
    SelfPickup,
    /// Order is delivered to the customer's address.
    Delivery,
}

impl BuyingType {
    /// All buying types, for form choices.
    pub const ALL: [Self; 2] = [Self::SelfPickup, Self::Delivery];

    /// Stored spelling.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SelfPickup => "self",
            Self::Delivery => "delivery",
        }
    }

    /// Human-readable label for templates.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::SelfPickup => "Self pickup",
            Self::Delivery => "Delivery",
        }
    }

    /// Whether an address must accompany the order.
    #[must_use]
    pub const fn requires_address(&self) -> bool {
        matches!(self, Self::Delivery)
    }
}

macro_rules! text_enum {
    ($ty:ty, $kind:literal) => {
        impl ::core::fmt::Display for $ty {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .into_iter()
                    .find(|v| v.as_str() == s)
                    .ok_or_else(|| UnknownVariant {
                        kind: $kind,
                        value: s.to_owned(),
                    })
            }
        }

        #[cfg(feature = "postgres")]
        impl sqlx::Type<sqlx::Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $ty {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
                Ok(s.parse()?)
            }
        }

        #[cfg(feature = "postgres")]
        impl sqlx::Encode<'_, sqlx::Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }
    };
}

text_enum!(OrderStatus, "order status");
text_enum!(BuyingType, "buying type");

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_spellings() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        assert_eq!(OrderStatus::default(), OrderStatus::New);
    }

    #[test]
    fn test_buying_type_spellings() {
        assert_eq!("self".parse::<BuyingType>().unwrap(), BuyingType::SelfPickup);
        assert_eq!(BuyingType::Delivery.to_string(), "delivery");
        assert_eq!(
            serde_json::to_string(&BuyingType::SelfPickup).unwrap(),
            "\"self\""
        );
        assert!(BuyingType::Delivery.requires_address());
        assert!(!BuyingType::SelfPickup.requires_address());
    }

    #[test]
    fn test_unknown_variant() {
        let err = "shipped".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.to_string(), "invalid order status: shipped");
    }
}
