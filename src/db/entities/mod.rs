//! SeaORM entities mapping to database tables.

pub mod link;

pub mod prelude {
    pub use super::link::Entity as Link;
    pub use super::link::Model as LinkModel;
    pub use super::link::ActiveModel as LinkActiveModel;
    pub use super::link::Column as LinkColumn;
}
