//! Uniqueness pre-checks.
//!
//! Each declared unique field or group becomes a `COUNT(*)` probe before the write.
//! The probe and the write are separate round-trips; run both inside a caller-owned
//! transaction executor when the race matters.

use super::Repository;
use crate::compile::column;
use crate::context::CallContext;
use crate::entity::Entity;
use crate::error::QuarryError;
use crate::executor::StoreExecutor;
use crate::record::Record;
use crate::value::Value;
use sea_query::ExprTrait;

impl<E: Entity, X: StoreExecutor> Repository<E, X> {
    /// Fail `Duplicate` when `candidate` collides with another live row.
    ///
    /// Only fields for which `touched` holds are checked. Zero values are not
    /// enforced: a zero single field is skipped, zero group members are dropped,
    /// and an all-zero group is skipped. A group is probed only when the candidate
    /// carries every member. `exclude` removes the row being updated from the probe.
    pub(crate) fn check_unique(
        &self,
        candidate: &Record,
        touched: &dyn Fn(&str) -> bool,
        exclude: Option<&Value>,
        ctx: &CallContext,
    ) -> Result<(), QuarryError> {
        for &field in E::unique_fields() {
            if !touched(field) {
                continue;
            }
            let Some(value) = candidate.get(field).filter(|v| !v.is_zero()) else {
                continue;
            };
            if self.count_matching(&[(field, value)], exclude, ctx)? > 0 {
                return Err(QuarryError::Duplicate {
                    field: field.to_string(),
                    value: value.as_text(),
                });
            }
        }

        for &group in E::unique_groups() {
            if !group.iter().any(|c| touched(c)) || !group.iter().all(|c| candidate.contains(c)) {
                continue;
            }
            let pairs: Vec<(&str, &Value)> = group
                .iter()
                .filter_map(|&c| candidate.get(c).filter(|v| !v.is_zero()).map(|v| (c, v)))
                .collect();
            if pairs.is_empty() {
                continue;
            }
            if self.count_matching(&pairs, exclude, ctx)? > 0 {
                return Err(QuarryError::Duplicate {
                    field: group.join(","),
                    value: None,
                });
            }
        }
        Ok(())
    }

    fn count_matching(
        &self,
        pairs: &[(&str, &Value)],
        exclude: Option<&Value>,
        ctx: &CallContext,
    ) -> Result<u64, QuarryError> {
        let mut exprs = Vec::with_capacity(pairs.len() + 1);
        for (field, value) in pairs {
            exprs.push(column(field)?.eq(value.to_sea_value()));
        }
        if let Some(id) = exclude {
            exprs.push(column(E::PRIMARY_KEY)?.ne(id.to_sea_value()));
        }
        let compiler = self.compiler();
        let statement = compiler.render(&compiler.count_where(compiler.scoped(None, exprs)?))?;
        self.count_statement(&statement, ctx)
    }
}
