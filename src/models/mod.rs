//! Domain model module declarations.

pub mod issue_index;
pub mod session;
pub mod work_item;
pub mod worker;
