use sea_orm::{ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, Select};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u64 = 20;
/// Requests above this are clamped rather than rejected.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Zero-based page request as it arrives on the query string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    page: u64,
    #[serde(default = "default_size")]
    size: u64,
}

fn default_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: u64, size: u64) -> Self {
        Self { page, size }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn size(&self) -> u64 {
        self.size.clamp(1, MAX_PAGE_SIZE)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u64,
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }

    pub fn is_last(&self) -> bool {
        self.page.saturating_add(1) >= self.total_pages
    }
}

/// Runs the count and the page query for `select`. Ordering is the caller's.
///
/// A page index past the last page yields empty content without issuing the
/// page query, so no offset is ever computed for it.
pub async fn fetch_page<'db, C, E>(
    db: &'db C,
    select: Select<E>,
    request: PageRequest,
) -> Result<Page<E::Model>, DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: Send + Sync + 'db,
{
    let size = request.size();
    let paginator = select.paginate(db, size);
    let totals = paginator.num_items_and_pages().await?;
    let content = if request.page() < totals.number_of_pages {
        paginator.fetch_page(request.page()).await?
    } else {
        Vec::new()
    };
    Ok(Page {
        content,
        page: request.page(),
        size,
        total_elements: totals.number_of_items,
        total_pages: totals.number_of_pages,
    })
}

#[cfg(test)]
mod tests {
    use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, QueryOrder, Schema, Set};

    use super::*;

    mod row {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
        #[sea_orm(table_name = "row")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i32,
            pub label: String,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    async fn seeded(count: usize) -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let backend = db.get_database_backend();
        let create = Schema::new(backend).create_table_from_entity(row::Entity);
        db.execute(backend.build(&create)).await.unwrap();
        for n in 0..count {
            row::ActiveModel {
                label: Set(format!("row {n}")),
                ..Default::default()
            }
            .insert(&db)
            .await
            .unwrap();
        }
        db
    }

    #[tokio::test]
    async fn pages_split_rows_in_id_order() {
        let db = seeded(5).await;
        let select = row::Entity::find().order_by_asc(row::Column::Id);
        let page = fetch_page(&db, select, PageRequest::new(1, 2)).await.unwrap();
        let ids: Vec<_> = page.content.iter().map(|r| r.id).collect();
        assert_eq!(ids, [3, 4]);
        assert_eq!(page.total_elements, 5);
        assert_eq!(page.total_pages, 3);
    }

    #[tokio::test]
    async fn huge_page_index_is_an_empty_page() {
        let db = seeded(3).await;
        let request = PageRequest::new(u64::MAX / 2, 100);
        let page = fetch_page(&db, row::Entity::find(), request).await.unwrap();
        assert!(page.content.is_empty());
        assert_eq!(page.page, u64::MAX / 2);
        assert_eq!(page.total_elements, 3);
        assert_eq!(page.total_pages, 1);

        let past_end = fetch_page(&db, row::Entity::find(), PageRequest::new(1, 100)).await.unwrap();
        assert!(past_end.content.is_empty());
    }

    #[test]
    fn size_is_clamped_to_cap() {
        assert_eq!(PageRequest::new(0, 10_000).size(), MAX_PAGE_SIZE);
        assert_eq!(PageRequest::new(0, 0).size(), 1);
        assert_eq!(PageRequest::new(3, 25).size(), 25);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let request: PageRequest = serde_json::from_str(r#"{"page": 2}"#).unwrap();
        assert_eq!(request.page(), 2);
        assert_eq!(request.size(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn map_keeps_paging_metadata() {
        let page = Page {
            content: vec![1, 2, 3],
            page: 1,
            size: 3,
            total_elements: 6,
            total_pages: 2,
        };
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.content, vec![10, 20, 30]);
        assert_eq!(mapped.total_elements, 6);
        assert!(mapped.is_last());
        let json = serde_json::to_value(&mapped).unwrap();
        assert_eq!(json["totalPages"], 2);
    }
}
