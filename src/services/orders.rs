use crate::{
    config::UnknownProductPolicy,
    entities::{order, order_item, product, Order, OrderItemModel, OrderModel, OrderStatus,
        Product, ProductModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, Set,
    TransactionTrait,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// One requested cart line: a product reference and a quantity.
#[derive(Debug, Clone, Copy)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// An order line joined with its product, as used by projections and the
/// checkout session builder.
#[derive(Debug, Clone)]
pub struct OrderLine {
    pub item: OrderItemModel,
    pub product: ProductModel,
}

/// An order together with its resolved lines.
#[derive(Debug, Clone)]
pub struct OrderDetails {
    pub order: OrderModel,
    pub lines: Vec<OrderLine>,
}

/// Order service: cart-line validation and order assembly.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    unknown_product_policy: UnknownProductPolicy,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        unknown_product_policy: UnknownProductPolicy,
    ) -> Self {
        Self {
            db,
            event_sender,
            unknown_product_policy,
        }
    }

    /// Resolve cart lines against the catalog in a single bulk fetch.
    ///
    /// If the same product id appears more than once, the first occurrence's
    /// quantity wins and later duplicates are ignored. Unknown ids are
    /// dropped or rejected depending on the configured policy.
    #[instrument(skip(self, lines), fields(requested = lines.len()))]
    pub async fn resolve_cart_lines(
        &self,
        lines: &[CartLine],
    ) -> Result<Vec<(ProductModel, i32)>, ServiceError> {
        let mut requested_ids: Vec<Uuid> = Vec::new();
        let mut quantities: HashMap<Uuid, i32> = HashMap::new();

        for line in lines {
            if line.quantity <= 0 {
                return Err(ServiceError::validation(
                    "quantity",
                    "quantity must be a positive integer",
                ));
            }
            // First occurrence wins.
            quantities.entry(line.product_id).or_insert_with(|| {
                requested_ids.push(line.product_id);
                line.quantity
            });
        }

        if requested_ids.is_empty() {
            return Ok(Vec::new());
        }

        let products = Product::find()
            .filter(product::Column::Id.is_in(requested_ids.clone()))
            .all(&*self.db)
            .await?;

        let by_id: HashMap<Uuid, ProductModel> =
            products.into_iter().map(|p| (p.id, p)).collect();

        if self.unknown_product_policy == UnknownProductPolicy::Reject {
            if let Some(missing) = requested_ids.iter().find(|id| !by_id.contains_key(id)) {
                return Err(ServiceError::validation(
                    "productId",
                    format!("unknown product id {}", missing),
                ));
            }
        }

        Ok(requested_ids
            .iter()
            .filter_map(|id| {
                let product = by_id.get(id)?.clone();
                let quantity = *quantities.get(id)?;
                Some((product, quantity))
            })
            .collect())
    }

    /// Create an order for an authenticated user: validated lines, status
    /// `Created`, UTC timestamp, empty comment, computed total. The order and
    /// its items commit in one transaction.
    #[instrument(skip(self, lines))]
    pub async fn create_order(
        &self,
        user_id: Uuid,
        lines: &[CartLine],
    ) -> Result<OrderDetails, ServiceError> {
        let resolved = self.resolve_cart_lines(lines).await?;

        let total_amount: Decimal = resolved
            .iter()
            .map(|(product, quantity)| product.price * Decimal::from(*quantity))
            .sum();

        let order_id = Uuid::new_v4();
        let now = Utc::now();

        let txn = self.db.begin().await?;

        let order_model = order::ActiveModel {
            id: Set(order_id),
            user_id: Set(user_id),
            status: Set(OrderStatus::Created),
            total_amount: Set(total_amount),
            comment: Set(String::new()),
            created_at: Set(now),
        };
        let created = order_model.insert(&txn).await?;

        let mut order_lines = Vec::with_capacity(resolved.len());
        for (product, quantity) in resolved {
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(product.id),
                quantity: Set(quantity),
            };
            let item = item.insert(&txn).await?;
            order_lines.push(OrderLine { item, product });
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCreated(order_id))
            .await;

        info!("Created order {} with {} lines", order_id, order_lines.len());
        Ok(OrderDetails {
            order: created,
            lines: order_lines,
        })
    }

    /// Load an order with its lines. Lines whose product has since been
    /// deleted are omitted from the projection.
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderDetails, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::not_found("orderId", "order does not exist or invalid orderId")
            })?;

        self.load_lines(order).await
    }

    /// Load an order owned by the given user. A foreign or unknown order id
    /// renders the same error, so ids cannot be probed across accounts.
    pub async fn get_order_for_user(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderDetails, ServiceError> {
        let details = self.get_order(order_id).await?;
        if details.order.user_id != user_id {
            return Err(ServiceError::not_found(
                "orderId",
                "order does not exist or invalid orderId",
            ));
        }
        Ok(details)
    }

    async fn load_lines(&self, order: OrderModel) -> Result<OrderDetails, ServiceError> {
        let items = order.find_related(crate::entities::OrderItem).all(&*self.db).await?;

        let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let products: HashMap<Uuid, ProductModel> = if product_ids.is_empty() {
            HashMap::new()
        } else {
            Product::find()
                .filter(product::Column::Id.is_in(product_ids))
                .all(&*self.db)
                .await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect()
        };

        let lines = items
            .into_iter()
            .filter_map(|item| {
                let product = products.get(&item.product_id)?.clone();
                Some(OrderLine { item, product })
            })
            .collect();

        Ok(OrderDetails { order, lines })
    }

    /// Write a new status, enforcing the allowed-transitions table.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderModel, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::not_found("orderId", "order does not exist or invalid orderId")
            })?;

        let old_status = order.status;
        if !old_status.can_transition_to(new_status) {
            return Err(ServiceError::validation(
                "status",
                format!("illegal status transition {} -> {}", old_status, new_status),
            ));
        }

        let mut active: order::ActiveModel = order.into();
        active.status = Set(new_status);
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: old_status.to_string(),
                new_status: new_status.to_string(),
            })
            .await;

        Ok(updated)
    }
}
