//! Query text and the injectable-medicines query builder.

use crate::{Column, ColumnType, Schema, TallyResult, ValidationError};
use sha2::{Digest, Sha256};
use std::fmt;

/// Immutable, non-empty query text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    text: String,
}

impl Query {
    pub fn new(text: impl Into<String>) -> TallyResult<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyQuery.into());
        }
        Ok(Self { text })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// SHA-256 of the query text, hex encoded.
    pub fn sha256_hex(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.text.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn quote(literal: &str) -> String {
    format!("'{}'", literal.replace('\'', "''"))
}

/// Monthly items and cost of injectable presentations, per organisation,
/// from the national prescribing dataset.
///
/// Rendering is deterministic: equal builders produce byte-identical SQL, so
/// the text can be hashed into a cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectableQuery {
    pub prescribing_table: String,
    pub practices_table: String,
    pub orgs_table: String,
    pub bnf_table: String,
    pub form_route_table: String,
    pub org_type: String,
    pub practice_setting: i64,
    /// `LIKE` patterns matched against form/route; any match qualifies.
    pub form_route_patterns: Vec<String>,
    /// BNF code prefixes excluded from the result.
    pub excluded_bnf_prefixes: Vec<String>,
}

impl Default for InjectableQuery {
    fn default() -> Self {
        Self {
            prescribing_table: "hscic.normalised_prescribing_standard".to_string(),
            practices_table: "hscic.practices".to_string(),
            orgs_table: "hscic.ccgs".to_string(),
            bnf_table: "hscic.bnf".to_string(),
            form_route_table: "ebmdatalab.measures.dmd_objs_with_form_route".to_string(),
            org_type: "CCG".to_string(),
            practice_setting: 4,
            form_route_patterns: vec![
                "%intravenous%".to_string(),
                "%injection%".to_string(),
                "%subcutaneous".to_string(),
            ],
            excluded_bnf_prefixes: vec![
                // insulins
                "060101".to_string(),
                // adrenaline
                "0304030C0".to_string(),
                // vaccines
                "140".to_string(),
            ],
        }
    }
}

impl InjectableQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_form_route_patterns(mut self, patterns: Vec<String>) -> Self {
        self.form_route_patterns = patterns;
        self
    }

    pub fn with_excluded_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.excluded_bnf_prefixes = prefixes;
        self
    }

    pub fn with_practice_setting(mut self, setting: i64) -> Self {
        self.practice_setting = setting;
        self
    }

    /// Render the SQL text.
    pub fn to_sql(&self) -> String {
        let mut sql = String::new();
        sql.push_str("SELECT\n");
        sql.push_str("    pct,\n");
        sql.push_str("    CAST(month AS DATE) AS month,\n");
        sql.push_str("    bnf.presentation,\n");
        sql.push_str("    bnf_code,\n");
        sql.push_str("    SUM(items) AS items,\n");
        sql.push_str("    SUM(actual_cost) AS cost\n");
        sql.push_str(&format!("FROM {} presc\n", self.prescribing_table));
        sql.push_str(&format!(
            "INNER JOIN {} pract ON presc.practice = pract.code\n",
            self.practices_table
        ));
        sql.push_str(&format!(
            "INNER JOIN {} AS ccg ON presc.pct = ccg.code\n",
            self.orgs_table
        ));
        sql.push_str(&format!(
            "INNER JOIN {} AS bnf ON presc.bnf_code = bnf.presentation_code\n",
            self.bnf_table
        ));
        sql.push_str("WHERE\n");
        sql.push_str(&format!("    ccg.org_type = {} AND\n", quote(&self.org_type)));
        sql.push_str(&format!(
            "    pract.setting = {} AND\n",
            self.practice_setting
        ));
        sql.push_str("    presc.bnf_code IN (\n");
        sql.push_str("        SELECT DISTINCT(bnf_code)\n");
        sql.push_str(&format!("        FROM {}\n", self.form_route_table));

        let mut predicates = Vec::new();
        if !self.form_route_patterns.is_empty() {
            let likes: Vec<String> = self
                .form_route_patterns
                .iter()
                .map(|p| format!("form_route LIKE {}", quote(p)))
                .collect();
            predicates.push(format!("({})", likes.join(" OR ")));
        }
        for prefix in &self.excluded_bnf_prefixes {
            predicates.push(format!("bnf_code NOT LIKE {}", quote(&format!("{}%", prefix))));
        }
        if !predicates.is_empty() {
            sql.push_str("        WHERE\n");
            sql.push_str("        ");
            sql.push_str(&predicates.join("\n        AND "));
            sql.push('\n');
        }

        sql.push_str("    )\n");
        sql.push_str("GROUP BY pct, month, presentation, bnf_code\n");
        sql.push_str("ORDER BY pct, month\n");
        sql
    }

    pub fn to_query(&self) -> TallyResult<Query> {
        Query::new(self.to_sql())
    }

    /// Columns the warehouse returns for this query.
    pub fn expected_schema() -> Schema {
        Schema::from_unique(vec![
            Column::new("pct", ColumnType::Text),
            Column::new("month", ColumnType::Date),
            Column::new("presentation", ColumnType::Text),
            Column::new("bnf_code", ColumnType::Text),
            Column::new("items", ColumnType::Int),
            Column::new("cost", ColumnType::Float),
        ])
    }
}
