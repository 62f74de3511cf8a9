use std::fmt;

use jiff::civil::Date;
use sea_orm::{ColumnTrait, Condition, Order};

use crate::{
    entities::release,
    error::{AppResult, FieldErrors},
    models::Status,
};

pub const DEFAULT_PAGE_SIZE: u64 = 5;
pub const MAX_PAGE_SIZE: u64 = 2000;
const MAX_OFFSET: u64 = i64::MAX as u64;

/// Optional list filters. Blank text values count as absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReleaseFilter {
    pub status: Option<Status>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub release_date: Option<Date>,
}

impl ReleaseFilter {
    pub fn new(
        status: Option<Status>,
        name: Option<String>,
        description: Option<String>,
        release_date: Option<Date>,
    ) -> Self {
        Self {
            status,
            name: name.filter(|s| !s.is_empty()),
            description: description.filter(|s| !s.is_empty()),
            release_date,
        }
    }

    /// Builds the store predicate; every supplied value must hold.
    ///
    /// Name and description are compared for *equality* with `%value%`, not with `LIKE`.
    /// Stored values never carry the `%` decoration, so these two filters match nothing.
    /// Whether substring matching was intended is unresolved; keep the comparison as is
    /// until that is settled.
    pub fn condition(&self) -> Condition {
        Condition::all()
            .add_option(self.status.map(|s| release::Column::Status.eq(s.as_str())))
            .add_option(self.name.as_ref().map(|n| release::Column::Name.eq(format!("%{n}%"))))
            .add_option(
                self.description
                    .as_ref()
                    .map(|d| release::Column::Description.eq(format!("%{d}%"))),
            )
            .add_option(self.release_date.map(|d| release::Column::ReleaseDate.eq(d.to_string())))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortProperty {
    Id,
    Name,
    Description,
    Status,
    ReleaseDate,
    CreatedAt,
    LastUpdatedAt,
}

impl SortProperty {
    const ALL: [SortProperty; 7] = [
        SortProperty::Id,
        SortProperty::Name,
        SortProperty::Description,
        SortProperty::Status,
        SortProperty::ReleaseDate,
        SortProperty::CreatedAt,
        SortProperty::LastUpdatedAt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortProperty::Id => "id",
            SortProperty::Name => "name",
            SortProperty::Description => "description",
            SortProperty::Status => "status",
            SortProperty::ReleaseDate => "releaseDate",
            SortProperty::CreatedAt => "createdAt",
            SortProperty::LastUpdatedAt => "lastUpdatedAt",
        }
    }

    pub fn column(self) -> release::Column {
        match self {
            SortProperty::Id => release::Column::Id,
            SortProperty::Name => release::Column::Name,
            SortProperty::Description => release::Column::Description,
            SortProperty::Status => release::Column::Status,
            SortProperty::ReleaseDate => release::Column::ReleaseDate,
            SortProperty::CreatedAt => release::Column::CreatedAt,
            SortProperty::LastUpdatedAt => release::Column::LastUpdatedAt,
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn order(self) -> Order {
        match self {
            Direction::Asc => Order::Asc,
            Direction::Desc => Order::Desc,
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("asc") {
            Some(Direction::Asc)
        } else if name.eq_ignore_ascii_case("desc") {
            Some(Direction::Desc)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortOrder {
    pub property: SortProperty,
    pub direction: Direction,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pageable {
    pub page: u64,
    pub size: u64,
    pub sort: Vec<SortOrder>,
}

impl Default for Pageable {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort: vec![SortOrder {
                property: SortProperty::ReleaseDate,
                direction: Direction::Desc,
            }],
        }
    }
}

impl Pageable {
    /// Resolves request parameters against the defaults (page 0, size 5, newest release first).
    ///
    /// A size of zero falls back to the default and sizes above [`MAX_PAGE_SIZE`] are clamped.
    /// The page is clamped so the row offset stays within what the store can bind.
    /// `sort` takes the form `property[,property...][,asc|desc]`, ascending when unspecified.
    pub fn from_params(
        page: Option<u64>,
        size: Option<u64>,
        sort: Option<&str>,
    ) -> AppResult<Self> {
        let size = match size {
            None | Some(0) => DEFAULT_PAGE_SIZE,
            Some(size) => size.min(MAX_PAGE_SIZE),
        };
        let sort = match sort.map(str::trim).filter(|s| !s.is_empty()) {
            Some(sort) => parse_sort(sort)?,
            None => Pageable::default().sort,
        };

        let page = page.unwrap_or(0).min(MAX_OFFSET / size);

        Ok(Pageable { page, size, sort })
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }
}

fn parse_sort(raw: &str) -> AppResult<Vec<SortOrder>> {
    let mut parts: Vec<&str> = raw.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();

    let direction = match parts.last().and_then(|last| Direction::from_name(last)) {
        Some(direction) => {
            parts.pop();
            direction
        },
        None => Direction::Asc,
    };

    let mut errors = FieldErrors::new();
    if parts.is_empty() {
        errors.add("sort", "Sort requires at least one property");
    }

    let mut orders = Vec::with_capacity(parts.len());
    for part in parts {
        match SortProperty::from_name(part) {
            Some(property) => orders.push(SortOrder { property, direction }),
            None => errors.add("sort", format!("No property '{part}' found for type 'Release'")),
        }
    }

    errors.into_result(orders)
}

impl fmt::Display for Pageable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page-{}:size-{}:sort-", self.page, self.size)?;
        if self.sort.is_empty() {
            return f.write_str("UNSORTED");
        }
        for (i, order) in self.sort.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let direction = match order.direction {
                Direction::Asc => "ASC",
                Direction::Desc => "DESC",
            };
            write!(f, "{}: {}", order.property.as_str(), direction)?;
        }
        Ok(())
    }
}

/// Cache key for one list request.
///
/// Absent filters render as empty segments. Free-text filters are percent-encoded so a `:`
/// inside a value can never shift the segment boundaries.
pub fn list_cache_key(filter: &ReleaseFilter, pageable: &Pageable) -> String {
    format!(
        "{}:{}:{}:{}:{}",
        filter.status.map(Status::as_str).unwrap_or_default(),
        filter.name.as_deref().map(urlencoding::encode).unwrap_or_default(),
        filter.description.as_deref().map(urlencoding::encode).unwrap_or_default(),
        filter.release_date.map(|d| d.to_string()).unwrap_or_default(),
        pageable,
    )
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;
    use sea_orm::{DbBackend, EntityTrait, QueryFilter, QueryTrait};

    use super::*;
    use crate::error::AppError;

    fn sql(filter: &ReleaseFilter) -> String {
        release::Entity::find()
            .filter(filter.condition())
            .build(DbBackend::Sqlite)
            .to_string()
    }

    #[test]
    fn empty_filter_has_no_predicate() {
        assert!(!sql(&ReleaseFilter::default()).contains("WHERE"));
    }

    #[test]
    fn supplied_values_are_and_ed() {
        let filter = ReleaseFilter::new(Some(Status::Done), None, None, Some(date(2030, 5, 1)));
        let sql = sql(&filter);
        assert!(sql.contains(r#""release"."status" = 'DONE'"#), "{sql}");
        assert!(sql.contains(r#""release"."release_date" = '2030-05-01'"#), "{sql}");
        assert!(sql.contains(" AND "), "{sql}");
    }

    #[test]
    fn text_filters_compare_for_equality_with_wildcards() {
        let filter = ReleaseFilter::new(None, Some("Rel".into()), Some("first".into()), None);
        let sql = sql(&filter);
        assert!(sql.contains(r#""release"."name" = '%Rel%'"#), "{sql}");
        assert!(sql.contains(r#""release"."description" = '%first%'"#), "{sql}");
        assert!(!sql.contains("LIKE"), "{sql}");
    }

    #[test]
    fn blank_text_filters_are_dropped() {
        let filter = ReleaseFilter::new(None, Some(String::new()), Some(String::new()), None);
        assert_eq!(filter, ReleaseFilter::default());
    }

    #[test]
    fn pageable_defaults_to_newest_first() {
        let pageable = Pageable::from_params(None, None, None).unwrap();
        assert_eq!(pageable, Pageable::default());
        assert_eq!(pageable.size, 5);
        assert_eq!(pageable.to_string(), "page-0:size-5:sort-releaseDate: DESC");
    }

    #[test]
    fn page_size_is_normalised() {
        assert_eq!(Pageable::from_params(None, Some(0), None).unwrap().size, DEFAULT_PAGE_SIZE);
        assert_eq!(Pageable::from_params(None, Some(10_000), None).unwrap().size, MAX_PAGE_SIZE);
        assert_eq!(Pageable::from_params(Some(3), Some(10), None).unwrap().offset(), 30);
    }

    #[test]
    fn huge_page_is_clamped_to_a_bindable_offset() {
        let pageable = Pageable::from_params(Some(u64::MAX), None, None).unwrap();
        assert!(pageable.offset() <= i64::MAX as u64);

        let pageable =
            Pageable::from_params(Some(i64::MAX as u64), Some(MAX_PAGE_SIZE), None).unwrap();
        assert_eq!(pageable.page, i64::MAX as u64 / MAX_PAGE_SIZE);
        assert!(pageable.offset() <= i64::MAX as u64);
    }

    #[test]
    fn sort_parameter_parses_properties_and_direction() {
        let pageable = Pageable::from_params(None, None, Some("name,createdAt,DESC")).unwrap();
        assert_eq!(
            pageable.sort,
            vec![
                SortOrder { property: SortProperty::Name, direction: Direction::Desc },
                SortOrder { property: SortProperty::CreatedAt, direction: Direction::Desc },
            ]
        );

        let pageable = Pageable::from_params(None, None, Some("status")).unwrap();
        assert_eq!(pageable.to_string(), "page-0:size-5:sort-status: ASC");
    }

    #[test]
    fn unknown_sort_property_is_a_validation_error() {
        match Pageable::from_params(None, None, Some("colour,asc")) {
            Err(AppError::Validation(errors)) => {
                assert_eq!(
                    errors.get("sort"),
                    Some("No property 'colour' found for type 'Release'")
                );
            },
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(Pageable::from_params(None, None, Some("desc")).is_err());
    }

    #[test]
    fn cache_key_is_deterministic() {
        let filter = ReleaseFilter::new(Some(Status::Done), None, None, None);
        let pageable = Pageable::default();
        let key = list_cache_key(&filter, &pageable);
        assert_eq!(key, list_cache_key(&filter.clone(), &pageable.clone()));
        assert_eq!(key, "DONE::::page-0:size-5:sort-releaseDate: DESC");
    }

    #[test]
    fn cache_key_changes_with_every_field() {
        let base_filter = ReleaseFilter::new(
            Some(Status::Created),
            Some("alpha".into()),
            Some("beta".into()),
            Some(date(2030, 1, 1)),
        );
        let base_page = Pageable::default();
        let base = list_cache_key(&base_filter, &base_page);

        let filters = [
            ReleaseFilter { status: Some(Status::Done), ..base_filter.clone() },
            ReleaseFilter { status: None, ..base_filter.clone() },
            ReleaseFilter { name: Some("alphb".into()), ..base_filter.clone() },
            ReleaseFilter { description: None, ..base_filter.clone() },
            ReleaseFilter { release_date: Some(date(2030, 1, 2)), ..base_filter.clone() },
        ];
        for filter in &filters {
            assert_ne!(list_cache_key(filter, &base_page), base, "{filter:?}");
        }

        let pages = [
            Pageable { page: 1, ..base_page.clone() },
            Pageable { size: 6, ..base_page.clone() },
            Pageable::from_params(None, None, Some("releaseDate,asc")).unwrap(),
        ];
        for page in &pages {
            assert_ne!(list_cache_key(&base_filter, page), base, "{page:?}");
        }
    }

    #[test]
    fn cache_key_segments_cannot_bleed() {
        let a = ReleaseFilter::new(None, Some("a:".into()), Some("b".into()), None);
        let b = ReleaseFilter::new(None, Some("a".into()), Some(":b".into()), None);
        let page = Pageable::default();
        assert_ne!(list_cache_key(&a, &page), list_cache_key(&b, &page));
    }
}
