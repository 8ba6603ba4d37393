mod injector;
mod retrieve;

pub use injector::{AnyInstance, Factory, InjectType, InjectValue, Injector};
pub use retrieve::Retrieve;
