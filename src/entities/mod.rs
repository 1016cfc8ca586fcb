pub mod order;
pub mod order_item;
pub mod product;
pub mod uploaded_file;
pub mod user;

pub use order::Entity as Order;
pub use order::Model as OrderModel;
pub use order::OrderStatus;
pub use order_item::Entity as OrderItem;
pub use order_item::Model as OrderItemModel;
pub use product::Entity as Product;
pub use product::Model as ProductModel;
pub use uploaded_file::Entity as UploadedFile;
pub use uploaded_file::Model as UploadedFileModel;
pub use user::Entity as User;
pub use user::Model as UserModel;
