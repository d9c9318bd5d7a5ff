mod result_set;
mod row;

pub use result_set::ResultSet;
pub use row::DbRow;
pub(crate) use row::build_column_index;
