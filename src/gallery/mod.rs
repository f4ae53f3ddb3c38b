pub mod ordering;

pub use ordering::{
    append_positions, compact, plan_reorder, OrderingError, Ordered, Page, PageRequest, Placement,
};
