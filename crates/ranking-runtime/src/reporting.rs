//! Live reporting over the warehouse.
//!
//! The dashboard's live panels are served from fixed SQL text. Every call is
//! independent: the warehouse opens its own connection per query, and a
//! failing query degrades only the response it belongs to.

use ranking_core::error::{RankingError, Result};
use serde_json::{json, Map, Value};
use tracing::warn;

/// One result row: column name → value, in select-list order.
pub type Row = Map<String, Value>;

/// A bound query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

/// A SQL data source.
pub trait Warehouse {
    /// Run `query` with `params` and return every row.
    fn fetch(&self, query: &str, params: &[QueryParam]) -> Result<Vec<Row>>;
}

/// Fixed query text used by [`ReportingService`].
///
/// Schema: `MANUFACTURER_CLEANED` 1-* `DEVICE_CLEANED` (on `MANUFACTURER_ID`)
/// 1-* `EVENTS_CLEANED` (on `DEVICE_ID`).
pub mod queries {
    pub const HEALTH: &str = "SELECT 1";

    pub const STATS: &str = "
        SELECT
            COUNT(DISTINCT m.ID) AS total_manufacturers,
            COUNT(DISTINCT d.ID) AS total_devices,
            COUNT(e.ID) AS total_failures,
            COUNT(DISTINCT m.PARENT_COMPANY) AS total_parent_companies,
            COUNT(DISTINCT m.REPRESENTATIVE) AS total_representatives
        FROM MANUFACTURER_CLEANED m
        LEFT JOIN DEVICE_CLEANED d ON m.ID = d.MANUFACTURER_ID
        LEFT JOIN EVENTS_CLEANED e ON d.ID = e.DEVICE_ID
    ";

    pub const PARENT_COMPANIES: &str = "
        SELECT PARENT_COMPANY AS name, COUNT(ID) AS count
        FROM MANUFACTURER_CLEANED
        GROUP BY PARENT_COMPANY
        ORDER BY count DESC
        LIMIT 5
    ";

    pub const REPRESENTATIVES: &str = "
        SELECT REPRESENTATIVE AS name, COUNT(ID) AS count
        FROM MANUFACTURER_CLEANED
        GROUP BY REPRESENTATIVE
        ORDER BY count DESC
        LIMIT 5
    ";

    pub const FRESHNESS: &str = "
        SELECT DATE_UPDATED AS date, COUNT(ID) AS records
        FROM EVENTS_CLEANED
        GROUP BY DATE_UPDATED
        ORDER BY date DESC
        LIMIT 10
    ";

    pub const MAJOR_FAILURES: &str = "
        SELECT d.NAME AS device, COUNT(e.ID) AS failures
        FROM DEVICE_CLEANED d
        JOIN EVENTS_CLEANED e ON d.ID = e.DEVICE_ID
        WHERE e.FAILURE_TYPE = 'MAJOR'
        GROUP BY d.NAME
        ORDER BY failures DESC
        LIMIT 10
    ";

    pub const MANUFACTURERS: &str = "
        SELECT * FROM MANUFACTURER_CLEANED
        ORDER BY ID
        LIMIT 50
    ";
}

/// A response body plus whether it represents success.
#[derive(Debug, Clone, PartialEq)]
pub struct FacadeResponse {
    pub ok: bool,
    pub body: Value,
}

impl FacadeResponse {
    fn success(body: Value) -> Self {
        Self { ok: true, body }
    }

    fn failure(body: Value) -> Self {
        Self { ok: false, body }
    }
}

// ── ReportingService ──────────────────────────────────────────────────────────

/// Health and dashboard reports over a [`Warehouse`].
pub struct ReportingService<W: Warehouse> {
    warehouse: W,
}

impl<W: Warehouse> ReportingService<W> {
    pub fn new(warehouse: W) -> Self {
        Self { warehouse }
    }

    /// Run `query`, degrading any failure to an empty row set.
    pub fn fetch_or_empty(&self, query: &str, params: &[QueryParam]) -> Vec<Row> {
        match self.warehouse.fetch(query, params) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "warehouse query failed");
                Vec::new()
            }
        }
    }

    /// `{"status": "healthy"}` when a trivial query succeeds, otherwise
    /// `{"status": "unhealthy"}`.
    pub fn health(&self) -> FacadeResponse {
        match self.warehouse.fetch(queries::HEALTH, &[]) {
            Ok(_) => FacadeResponse::success(json!({ "status": "healthy" })),
            Err(e) => {
                warn!(error = %e, "health check failed");
                FacadeResponse::failure(json!({ "status": "unhealthy" }))
            }
        }
    }

    /// Live dashboard panels, or `{"error": "..."}` when the stats query
    /// fails or returns no row. Any other failing panel is reported empty.
    pub fn dashboard(&self) -> FacadeResponse {
        match self.dashboard_body() {
            Ok(body) => FacadeResponse::success(body),
            Err(e) => {
                warn!(error = %e, "dashboard query failed");
                FacadeResponse::failure(json!({ "error": e.to_string() }))
            }
        }
    }

    fn dashboard_body(&self) -> Result<Value> {
        let stats = self
            .warehouse
            .fetch(queries::STATS, &[])?
            .into_iter()
            .next()
            .ok_or_else(|| RankingError::Query("stats query returned no rows".to_string()))?;
        let parent_companies = self.fetch_or_empty(queries::PARENT_COMPANIES, &[]);
        let representatives = self.fetch_or_empty(queries::REPRESENTATIVES, &[]);
        let freshness = self.fetch_or_empty(queries::FRESHNESS, &[]);
        let failures = self.fetch_or_empty(queries::MAJOR_FAILURES, &[]);
        let manufacturers = self.fetch_or_empty(queries::MANUFACTURERS, &[]);

        Ok(json!({
            "stats": stats,
            "parentCompanies": parent_companies,
            "representatives": representatives,
            "freshness": freshness,
            "failures": failures,
            "manufacturers": manufacturers,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Returns canned rows and records every query it was asked to run.
    struct CannedWarehouse {
        calls: RefCell<Vec<String>>,
    }

    impl CannedWarehouse {
        fn new() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Warehouse for CannedWarehouse {
        fn fetch(&self, query: &str, _params: &[QueryParam]) -> Result<Vec<Row>> {
            self.calls.borrow_mut().push(query.to_string());
            let mut row = Row::new();
            row.insert("value".to_string(), json!(1));
            Ok(vec![row])
        }
    }

    struct BrokenWarehouse;

    impl Warehouse for BrokenWarehouse {
        fn fetch(&self, _query: &str, _params: &[QueryParam]) -> Result<Vec<Row>> {
            Err(RankingError::Query("connection refused".to_string()))
        }
    }

    /// Fails only the freshness query.
    struct StaleFreshnessWarehouse;

    impl Warehouse for StaleFreshnessWarehouse {
        fn fetch(&self, query: &str, _params: &[QueryParam]) -> Result<Vec<Row>> {
            if query == queries::FRESHNESS {
                Err(RankingError::Query("timeout".to_string()))
            } else {
                let mut row = Row::new();
                row.insert("value".to_string(), json!(1));
                Ok(vec![row])
            }
        }
    }

    /// Succeeds for every query except the stats query, which yields no rows.
    struct EmptyStatsWarehouse;

    impl Warehouse for EmptyStatsWarehouse {
        fn fetch(&self, query: &str, _params: &[QueryParam]) -> Result<Vec<Row>> {
            if query == queries::STATS {
                Ok(Vec::new())
            } else {
                Ok(vec![Row::new()])
            }
        }
    }

    #[test]
    fn test_health_healthy() {
        let service = ReportingService::new(CannedWarehouse::new());
        let response = service.health();
        assert!(response.ok);
        assert_eq!(response.body, json!({ "status": "healthy" }));
    }

    #[test]
    fn test_health_unhealthy_on_failure() {
        let service = ReportingService::new(BrokenWarehouse);
        let response = service.health();
        assert!(!response.ok);
        assert_eq!(response.body, json!({ "status": "unhealthy" }));
    }

    #[test]
    fn test_fetch_or_empty_degrades() {
        let service = ReportingService::new(BrokenWarehouse);
        assert!(service.fetch_or_empty("SELECT 1", &[]).is_empty());
    }

    #[test]
    fn test_dashboard_runs_every_panel_query() {
        let service = ReportingService::new(CannedWarehouse::new());
        let response = service.dashboard();

        assert!(response.ok);
        for key in [
            "stats",
            "parentCompanies",
            "representatives",
            "freshness",
            "failures",
            "manufacturers",
        ] {
            assert!(response.body.get(key).is_some(), "missing {key}");
        }
        assert_eq!(response.body["stats"], json!({ "value": 1 }));
        assert_eq!(service.warehouse.calls.borrow().len(), 6);
    }

    #[test]
    fn test_dashboard_structured_error() {
        let service = ReportingService::new(BrokenWarehouse);
        let response = service.dashboard();
        assert!(!response.ok);
        assert_eq!(
            response.body,
            json!({ "error": "Query failed: connection refused" })
        );
    }

    #[test]
    fn test_dashboard_failing_panel_reported_empty() {
        let service = ReportingService::new(StaleFreshnessWarehouse);
        let response = service.dashboard();

        assert!(response.ok, "{}", response.body);
        assert_eq!(response.body["freshness"], json!([]));
        assert_eq!(response.body["stats"], json!({ "value": 1 }));
        assert_eq!(response.body["manufacturers"], json!([{ "value": 1 }]));
    }

    #[test]
    fn test_dashboard_error_when_stats_empty() {
        let service = ReportingService::new(EmptyStatsWarehouse);
        let response = service.dashboard();
        assert!(!response.ok);
        assert!(response.body["error"]
            .as_str()
            .unwrap()
            .contains("stats query returned no rows"));
    }
}
