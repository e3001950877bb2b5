//! Per (record type, column list) scan plans.

use std::any::TypeId;
use std::sync::{Arc, LazyLock};

use tracing::debug;

use crate::cache::{GenerationalCache, CACHE_CAPACITY};
use crate::error::{Error, Result};
use crate::record::{field_index, shape_at_path, Holder, RecordDescriptor};

/// Separates column names in plan cache keys.
const COLUMN_SEPARATOR: &str = "\x1f";

static SCAN_PLANS: LazyLock<GenerationalCache<(TypeId, String), Arc<ScanPlan>>> =
    LazyLock::new(|| GenerationalCache::new("scan_plan", CACHE_CAPACITY));

/// How one result column reaches its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnStrategy {
    /// No field maps the column; the value is dropped.
    Discard,
    /// The field converts itself. Optional fields receive the raw value after
    /// the fetch, and stay absent on NULL.
    CustomScan,
    /// Optional plain leaf: buffered in a holder and moved in after the fetch.
    OptionalLeaf,
    /// Plain leaf written in place.
    DirectLeaf,
}

/// Plan for a single column.
#[derive(Debug, Clone)]
pub struct ColumnPlan {
    /// Result column name.
    pub column: String,
    /// Strategy.
    pub strategy: ColumnStrategy,
    /// Field path, empty for [`ColumnStrategy::Discard`].
    pub path: Vec<usize>,
    /// Whether the leaf is an `Option`.
    pub optional: bool,
    pub(crate) holder: Option<fn() -> Box<dyn Holder>>,
}

/// Immutable scan plan, shared across threads.
#[derive(Debug)]
pub struct ScanPlan {
    /// Destination record type name.
    pub record: &'static str,
    /// One entry per result column, in result order.
    pub columns: Vec<ColumnPlan>,
}

/// Returns the plan for scanning `columns` into the described record,
/// building and caching it on first use.
///
/// # Errors
///
/// [`Error::FieldAmbiguous`] when a column maps to more than one field.
pub fn scan_plan(descriptor: &'static RecordDescriptor, columns: &[String]) -> Result<Arc<ScanPlan>> {
    let key = (descriptor.id(), columns.join(COLUMN_SEPARATOR));
    SCAN_PLANS.get_or_try_insert_with(key, || build(descriptor, columns).map(Arc::new))
}

fn build(descriptor: &'static RecordDescriptor, columns: &[String]) -> Result<ScanPlan> {
    let index = field_index(descriptor);
    let plans = columns
        .iter()
        .map(|column| {
            let Some(info) = index.get(column) else {
                return Ok(ColumnPlan {
                    column: column.clone(),
                    strategy: ColumnStrategy::Discard,
                    path: Vec::new(),
                    optional: false,
                    holder: None,
                });
            };
            if info.ambiguous {
                return Err(Error::FieldAmbiguous {
                    name: column.clone(),
                    row: None,
                });
            }
            let field = shape_at_path(descriptor, &info.path).ok_or_else(|| {
                Error::ScanShape(format!("no field behind column '{column}'"))
            })?;
            let shape = field.shape;
            let (strategy, holder) = if shape.is_convert() {
                (ColumnStrategy::CustomScan, None)
            } else if let (true, Some(holder)) = (shape.optional, shape.holder) {
                (ColumnStrategy::OptionalLeaf, Some(holder))
            } else {
                (ColumnStrategy::DirectLeaf, None)
            };
            Ok(ColumnPlan {
                column: column.clone(),
                strategy,
                path: info.path.clone(),
                optional: shape.optional,
                holder,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(
        record = descriptor.name,
        columns = plans.len(),
        "built scan plan"
    );
    Ok(ScanPlan {
        record: descriptor.name,
        columns: plans,
    })
}
