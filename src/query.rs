use serde::Deserialize;

/// SQL query builder for the member roster listing
/// Builds a single parameterized query with filters, sorting, and pagination
pub struct RosterQueryBuilder {
    base_query: String,
    where_clauses: Vec<String>,
    params: Vec<String>,
    order_clause: Option<String>,
    limit: u32,
    offset: u32,
}

impl RosterQueryBuilder {
    /// Creates a new RosterQueryBuilder scoped to one coach's roster.
    /// The coach id comes from the authenticated actor, never from user
    /// text, so it is rendered inline rather than bound.
    pub fn new(coach_id: i32) -> Self {
        Self {
            base_query: format!("SELECT * FROM members WHERE coach_id = {}", coach_id),
            where_clauses: Vec::new(),
            params: Vec::new(),
            order_clause: None,
            limit: 10,
            offset: 0,
        }
    }

    /// Adds a search filter for partial name matching (case-insensitive)
    pub fn add_search_filter(&mut self, search: &str) {
        let param_index = self.params.len() + 1;
        self.where_clauses.push(format!("name ILIKE ${}", param_index));
        self.params.push(format!("%{}%", search));
    }

    /// Adds remaining-credit range filters (min and/or max, both inclusive).
    /// Values are validated non-negative integers, rendered inline.
    pub fn add_credit_range(&mut self, min: Option<u32>, max: Option<u32>) {
        if let Some(min_credits) = min {
            self.where_clauses
                .push(format!("remaining_credits >= {}", min_credits));
        }

        if let Some(max_credits) = max {
            self.where_clauses
                .push(format!("remaining_credits <= {}", max_credits));
        }
    }

    /// Sets the sort order for the query
    pub fn set_sort(&mut self, field: SortField, order: SortOrder) {
        let field_name = match field {
            SortField::Name => "name",
            SortField::RemainingCredits => "remaining_credits",
            SortField::WindowEnd => "window_end",
        };

        let order_str = match order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };

        self.order_clause = Some(format!("{} {}", field_name, order_str));
    }

    /// Sets pagination parameters
    /// Calculates LIMIT and OFFSET based on page number and limit
    pub fn set_pagination(&mut self, page: u32, limit: u32) {
        self.limit = limit;
        self.offset = (page - 1) * limit;
    }

    /// Builds the final SQL query string with all parameters
    /// Returns a tuple of (query_string, parameters)
    pub fn build(&self) -> (String, Vec<String>) {
        let mut query = self.base_query.clone();

        for clause in &self.where_clauses {
            query.push_str(" AND ");
            query.push_str(clause);
        }

        if let Some(ref order) = self.order_clause {
            query.push_str(" ORDER BY ");
            query.push_str(order);
        }

        // LIMIT and OFFSET are integers, rendered directly
        query.push_str(&format!(" LIMIT {}", self.limit));
        query.push_str(&format!(" OFFSET {}", self.offset));

        (query, self.params.clone())
    }
}

/// Query parameters extracted from the roster listing request
/// All fields are optional to support flexible querying
#[derive(Debug, Deserialize)]
pub struct RosterQueryParams {
    /// Search term for partial name matching (case-insensitive)
    pub search: Option<String>,
    /// Coach whose roster to list; only honored for admin actors
    pub coach_id: Option<i32>,
    /// Minimum remaining credits (inclusive)
    pub min_credits: Option<u32>,
    /// Maximum remaining credits (inclusive)
    pub max_credits: Option<u32>,
    /// Sort field: "name", "credits" or "window_end"
    pub sort: Option<String>,
    /// Sort order: "asc" or "desc"
    pub order: Option<String>,
    /// Page number (1-indexed, defaults to 1)
    pub page: Option<u32>,
    /// Items per page (defaults to 10)
    pub limit: Option<u32>,
}

/// Sort field options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    RemainingCredits,
    WindowEnd,
}

/// Sort order options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Validated and normalized roster query parameters
#[derive(Debug)]
pub struct ValidatedRosterQuery {
    /// Normalized search term (trimmed, None if empty)
    pub search: Option<String>,
    pub coach_id: Option<i32>,
    pub min_credits: Option<u32>,
    pub max_credits: Option<u32>,
    /// Sort field (None means no sorting)
    pub sort_field: Option<SortField>,
    pub sort_order: SortOrder,
    pub page: u32,
    pub limit: u32,
}

/// Validation error type
#[derive(Debug)]
pub struct QueryValidationError {
    pub message: String,
}

impl std::fmt::Display for QueryValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for QueryValidationError {}

/// Roster query parameter validator
pub struct RosterQueryValidator;

impl RosterQueryValidator {
    /// Validates and normalizes query parameters
    /// Returns ValidatedRosterQuery on success or QueryValidationError on failure
    pub fn validate(
        params: RosterQueryParams,
    ) -> Result<ValidatedRosterQuery, QueryValidationError> {
        let search = Self::normalize_string(params.search);

        if let (Some(min), Some(max)) = (params.min_credits, params.max_credits) {
            if min > max {
                return Err(QueryValidationError {
                    message: "min_credits cannot be greater than max_credits".to_string(),
                });
            }
        }

        let sort_field = if let Some(sort_str) = params.sort {
            Some(Self::parse_sort_field(&sort_str)?)
        } else {
            None
        };

        let sort_order = if let Some(order_str) = params.order {
            Self::parse_sort_order(&order_str)?
        } else {
            // Names read naturally ascending, credit balances are usually
            // inspected highest-first
            match sort_field {
                Some(SortField::RemainingCredits) => SortOrder::Desc,
                _ => SortOrder::Asc,
            }
        };

        let page = if let Some(p) = params.page {
            Self::validate_pagination_param(p, "page")?;
            p
        } else {
            1
        };

        let limit = if let Some(l) = params.limit {
            Self::validate_pagination_param(l, "limit")?;
            l
        } else {
            10
        };

        Ok(ValidatedRosterQuery {
            search,
            coach_id: params.coach_id,
            min_credits: params.min_credits,
            max_credits: params.max_credits,
            sort_field,
            sort_order,
            page,
            limit,
        })
    }

    /// Normalizes string parameters by trimming whitespace
    /// Returns None if the string is empty or whitespace-only
    fn normalize_string(s: Option<String>) -> Option<String> {
        s.and_then(|s| {
            let trimmed = s.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        })
    }

    /// Parses sort field string to SortField enum
    fn parse_sort_field(s: &str) -> Result<SortField, QueryValidationError> {
        match s.to_lowercase().as_str() {
            "name" => Ok(SortField::Name),
            "credits" => Ok(SortField::RemainingCredits),
            "window_end" => Ok(SortField::WindowEnd),
            _ => Err(QueryValidationError {
                message: format!(
                    "Invalid sort field '{}'. Must be 'name', 'credits' or 'window_end'",
                    s
                ),
            }),
        }
    }

    /// Parses sort order string to SortOrder enum
    fn parse_sort_order(s: &str) -> Result<SortOrder, QueryValidationError> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(QueryValidationError {
                message: format!("Invalid sort order '{}'. Must be 'asc' or 'desc'", s),
            }),
        }
    }

    /// Validates pagination parameters (page and limit)
    fn validate_pagination_param(value: u32, param_name: &str) -> Result<(), QueryValidationError> {
        if value == 0 {
            return Err(QueryValidationError {
                message: format!("{} must be a positive number (greater than 0)", param_name),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_basic_query() {
        let builder = RosterQueryBuilder::new(7);
        let (query, params) = builder.build();

        assert!(query.contains("SELECT * FROM members WHERE coach_id = 7"));
        assert!(query.contains("LIMIT 10"));
        assert!(query.contains("OFFSET 0"));
        assert_eq!(params.len(), 0);
    }

    #[test]
    fn test_builder_with_search() {
        let mut builder = RosterQueryBuilder::new(7);
        builder.add_search_filter("dana");
        let (query, params) = builder.build();

        assert!(query.contains("AND name ILIKE $1"));
        assert_eq!(params[0], "%dana%");
    }

    #[test]
    fn test_builder_with_credit_range() {
        let mut builder = RosterQueryBuilder::new(7);
        builder.add_credit_range(Some(1), Some(20));
        let (query, params) = builder.build();

        assert!(query.contains("AND remaining_credits >= 1"));
        assert!(query.contains("AND remaining_credits <= 20"));
        assert_eq!(params.len(), 0);
    }

    #[test]
    fn test_builder_with_sorting() {
        let mut builder = RosterQueryBuilder::new(7);
        builder.set_sort(SortField::RemainingCredits, SortOrder::Desc);
        let (query, _) = builder.build();

        assert!(query.contains("ORDER BY remaining_credits DESC"));
    }

    #[test]
    fn test_builder_with_pagination() {
        let mut builder = RosterQueryBuilder::new(7);
        builder.set_pagination(3, 25);
        let (query, _params) = builder.build();

        assert!(query.contains("LIMIT 25"));
        assert!(query.contains("OFFSET 50"));
    }

    #[test]
    fn test_builder_combined_filters() {
        let mut builder = RosterQueryBuilder::new(2);
        builder.add_search_filter("co");
        builder.add_credit_range(Some(1), None);
        builder.set_sort(SortField::Name, SortOrder::Asc);
        builder.set_pagination(1, 10);

        let (query, params) = builder.build();

        assert!(query.contains("WHERE coach_id = 2"));
        assert!(query.contains("AND name ILIKE $1"));
        assert!(query.contains("AND remaining_credits >= 1"));
        assert!(query.contains("ORDER BY name ASC"));
        assert_eq!(params[0], "%co%");
    }

    #[test]
    fn test_normalize_string_with_whitespace() {
        assert_eq!(
            RosterQueryValidator::normalize_string(Some("  dana  ".to_string())),
            Some("dana".to_string())
        );
    }

    #[test]
    fn test_normalize_string_empty() {
        assert_eq!(
            RosterQueryValidator::normalize_string(Some("   ".to_string())),
            None
        );
        assert_eq!(RosterQueryValidator::normalize_string(None), None);
    }

    #[test]
    fn test_parse_sort_field() {
        assert_eq!(
            RosterQueryValidator::parse_sort_field("name").unwrap(),
            SortField::Name
        );
        assert_eq!(
            RosterQueryValidator::parse_sort_field("CREDITS").unwrap(),
            SortField::RemainingCredits
        );
        assert_eq!(
            RosterQueryValidator::parse_sort_field("window_end").unwrap(),
            SortField::WindowEnd
        );
        assert!(RosterQueryValidator::parse_sort_field("price").is_err());
    }

    #[test]
    fn test_parse_sort_order() {
        assert_eq!(
            RosterQueryValidator::parse_sort_order("asc").unwrap(),
            SortOrder::Asc
        );
        assert_eq!(
            RosterQueryValidator::parse_sort_order("DESC").unwrap(),
            SortOrder::Desc
        );
        assert!(RosterQueryValidator::parse_sort_order("sideways").is_err());
    }

    #[test]
    fn test_validate_defaults() {
        let params = RosterQueryParams {
            search: None,
            coach_id: None,
            min_credits: None,
            max_credits: None,
            sort: None,
            order: None,
            page: None,
            limit: None,
        };

        let validated = RosterQueryValidator::validate(params).unwrap();
        assert_eq!(validated.page, 1);
        assert_eq!(validated.limit, 10);
        assert_eq!(validated.sort_order, SortOrder::Asc);
    }

    #[test]
    fn test_validate_credit_sort_defaults_descending() {
        let params = RosterQueryParams {
            search: None,
            coach_id: None,
            min_credits: None,
            max_credits: None,
            sort: Some("credits".to_string()),
            order: None,
            page: None,
            limit: None,
        };

        let validated = RosterQueryValidator::validate(params).unwrap();
        assert_eq!(validated.sort_field, Some(SortField::RemainingCredits));
        assert_eq!(validated.sort_order, SortOrder::Desc);
    }

    #[test]
    fn test_validate_credit_range_rejected_when_inverted() {
        let params = RosterQueryParams {
            search: None,
            coach_id: None,
            min_credits: Some(10),
            max_credits: Some(5),
            sort: None,
            order: None,
            page: None,
            limit: None,
        };

        assert!(RosterQueryValidator::validate(params).is_err());
    }

    #[test]
    fn test_validate_zero_page_rejected() {
        let params = RosterQueryParams {
            search: None,
            coach_id: None,
            min_credits: None,
            max_credits: None,
            sort: None,
            order: None,
            page: Some(0),
            limit: None,
        };

        assert!(RosterQueryValidator::validate(params).is_err());
    }
}
