use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    #[sea_orm(column_type = "Text")]
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Order lifecycle states.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum OrderStatus {
    #[sea_orm(string_value = "created")]
    Created,
    #[sea_orm(string_value = "successful_payment")]
    SuccessfulPayment,
    #[sea_orm(string_value = "payment_error")]
    PaymentError,
    #[sea_orm(string_value = "ready_to_pick")]
    ReadyToPick,
    #[sea_orm(string_value = "on_the_way")]
    OnTheWay,
}

impl OrderStatus {
    /// Allowed transitions. Payment confirmation and fulfillment drive the
    /// progression; a failed payment may be retried.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Created, SuccessfulPayment)
                | (Created, PaymentError)
                | (PaymentError, SuccessfulPayment)
                | (SuccessfulPayment, ReadyToPick)
                | (ReadyToPick, OnTheWay)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::OrderStatus::*;

    #[test]
    fn happy_path_transitions_allowed() {
        assert!(Created.can_transition_to(SuccessfulPayment));
        assert!(Created.can_transition_to(PaymentError));
        assert!(PaymentError.can_transition_to(SuccessfulPayment));
        assert!(SuccessfulPayment.can_transition_to(ReadyToPick));
        assert!(ReadyToPick.can_transition_to(OnTheWay));
    }

    #[test]
    fn illegal_jumps_rejected() {
        assert!(!Created.can_transition_to(OnTheWay));
        assert!(!Created.can_transition_to(ReadyToPick));
        assert!(!SuccessfulPayment.can_transition_to(Created));
        assert!(!OnTheWay.can_transition_to(ReadyToPick));
        assert!(!PaymentError.can_transition_to(ReadyToPick));
    }

    #[test]
    fn terminal_state_has_no_exits() {
        for next in [Created, SuccessfulPayment, PaymentError, ReadyToPick, OnTheWay] {
            assert!(!OnTheWay.can_transition_to(next));
        }
    }
}
