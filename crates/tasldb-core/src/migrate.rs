//! Migration: streaming every source element through a mapping.

use std::path::Path;

use tracing::{debug, info};

use tasldb_error::{Result, TaslError};
use tasldb_types::Mapping;

use crate::database::Database;
use crate::eval::Evaluator;

impl Database {
    /// Create a database at `target_path` with the mapping's target schema
    /// and populate it by evaluating every rule over this database.
    ///
    /// The mapping's source schema must structurally equal this database's
    /// schema. Source ids are preserved into the target. Foreign-key
    /// enforcement on the target is suspended while rules run, since a rule
    /// may emit references to elements a later rule writes, and restored
    /// before returning.
    pub fn migrate(&self, mapping: &Mapping, target_path: Option<&Path>) -> Result<Database> {
        if mapping.source != *self.schema() {
            return Err(TaslError::schema_mismatch(
                "mapping source schema does not match the database schema",
            ));
        }
        let target = Database::create(target_path, mapping.target.clone())?;
        target.conn.pragma_update(None, "foreign_keys", false)?;
        let migrated = self.run_migration(mapping, &target);
        target.conn.pragma_update(None, "foreign_keys", true)?;
        migrated?;
        Ok(target)
    }

    fn run_migration(&self, mapping: &Mapping, target: &Database) -> Result<()> {
        let evaluator = Evaluator {
            source: self,
            mapping,
        };
        for map in &mapping.maps {
            let source_ty = self
                .schema()
                .get(&map.source)
                .ok_or_else(|| TaslError::no_class(&map.source))?;
            let mut migrated = 0u64;
            for entry in self.entries(&map.source)? {
                let (id, value) = entry?;
                let result = evaluator.evaluate(map, source_ty, value)?;
                target.set(&map.target, id, &result)?;
                migrated += 1;
            }
            debug!(
                source = %map.source,
                target = %map.target,
                elements = migrated,
                "migrated class"
            );
        }
        info!(rules = mapping.maps.len(), "migration complete");
        Ok(())
    }
}
