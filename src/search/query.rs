use serde_json::{json, Value};
use uuid::Uuid;

/// Catalog document field names used in queries
pub mod fields {
    pub const NOTES: &str = "notes";
    pub const ACCORDS: &str = "accords";
    pub const BRAND: &str = "brand";
    pub const CONCENTRATION: &str = "concentration";
    pub const GENDER: &str = "gender";
    pub const SEASONS: &str = "seasons";
    pub const OCCASIONS: &str = "occasions";
    pub const INTENSITY: &str = "intensity";
    pub const AGE_GROUP: &str = "age_group";
    pub const DESCRIPTION: &str = "description";
    pub const APPROVED: &str = "approved";
}

/// One clause of a weighted boolean query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryClause {
    /// Exact match on a single field value
    Term {
        field: String,
        value: String,
        boost: f32,
    },
    /// Match on any of several values of one field, sharing one boost
    Terms {
        field: String,
        values: Vec<String>,
        boost: f32,
    },
    /// Free-text match across several fields
    MultiMatch {
        fields: Vec<String>,
        query: String,
        boost: f32,
    },
    /// Match on document identifiers
    Ids { values: Vec<Uuid> },
}

impl QueryClause {
    pub fn term(field: &str, value: impl Into<String>, boost: f32) -> Self {
        QueryClause::Term {
            field: field.to_string(),
            value: value.into(),
            boost,
        }
    }

    pub fn terms(field: &str, values: Vec<String>, boost: f32) -> Self {
        QueryClause::Terms {
            field: field.to_string(),
            values,
            boost,
        }
    }

    pub fn multi_match(fields: &[&str], query: impl Into<String>, boost: f32) -> Self {
        QueryClause::MultiMatch {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            query: query.into(),
            boost,
        }
    }

    pub fn ids(values: Vec<Uuid>) -> Self {
        QueryClause::Ids { values }
    }

    /// Renders the clause in the engine's JSON query DSL
    fn to_json(&self) -> Value {
        match self {
            QueryClause::Term { field, value, boost } => {
                let mut inner = serde_json::Map::new();
                inner.insert(field.clone(), json!({ "value": value, "boost": boost }));
                json!({ "term": inner })
            }
            QueryClause::Terms { field, values, boost } => {
                let mut inner = serde_json::Map::new();
                inner.insert(field.clone(), json!(values));
                inner.insert("boost".to_string(), json!(boost));
                json!({ "terms": inner })
            }
            QueryClause::MultiMatch { fields, query, boost } => json!({
                "multi_match": { "query": query, "fields": fields, "boost": boost }
            }),
            QueryClause::Ids { values } => {
                let ids: Vec<String> = values.iter().map(|id| id.to_string()).collect();
                json!({ "ids": { "values": ids } })
            }
        }
    }
}

/// A weighted boolean query tree
///
/// Should-clauses contribute score mass, filter-clauses restrict without
/// scoring, must-not-clauses exclude. `minimum_should_match` requires at
/// least that many should-clauses to match each hit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoolQuery {
    pub should: Vec<QueryClause>,
    pub filter: Vec<QueryClause>,
    pub must_not: Vec<QueryClause>,
    pub minimum_should_match: u32,
}

impl BoolQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn should(mut self, clause: QueryClause) -> Self {
        self.should.push(clause);
        self
    }

    pub fn filter(mut self, clause: QueryClause) -> Self {
        self.filter.push(clause);
        self
    }

    pub fn must_not(mut self, clause: QueryClause) -> Self {
        self.must_not.push(clause);
        self
    }

    pub fn minimum_should_match(mut self, count: u32) -> Self {
        self.minimum_should_match = count;
        self
    }

    pub fn has_should_clauses(&self) -> bool {
        !self.should.is_empty()
    }

    /// Renders the full query in the engine's JSON DSL, omitting empty
    /// sections
    pub fn to_json(&self) -> Value {
        let mut bool_body = serde_json::Map::new();

        if !self.should.is_empty() {
            let clauses: Vec<Value> = self.should.iter().map(QueryClause::to_json).collect();
            bool_body.insert("should".to_string(), Value::Array(clauses));
        }
        if !self.filter.is_empty() {
            let clauses: Vec<Value> = self.filter.iter().map(QueryClause::to_json).collect();
            bool_body.insert("filter".to_string(), Value::Array(clauses));
        }
        if !self.must_not.is_empty() {
            let clauses: Vec<Value> = self.must_not.iter().map(QueryClause::to_json).collect();
            bool_body.insert("must_not".to_string(), Value::Array(clauses));
        }
        if self.minimum_should_match > 0 {
            bool_body.insert(
                "minimum_should_match".to_string(),
                json!(self.minimum_should_match),
            );
        }

        json!({ "bool": Value::Object(bool_body) })
    }
}
