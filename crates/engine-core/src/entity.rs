use crate::walker::PagedQueryWalker;
use connectors::service::PagedQueryService;
use model::{pagination::page_size::PageSize, query::QuerySpec};

/// A record type that can be paginated through a query service.
///
/// ```
/// use engine_core::entity::Entity;
/// use model::pagination::page_size::PageSize;
///
/// struct User;
///
/// impl Entity for User {
///     const NAME: &'static str = "users";
///     const PAGE_SIZE: PageSize = PageSize::of(200);
/// }
///
/// assert_eq!(User::query().entity, "users");
/// ```
pub trait Entity {
    /// Entity name as known to the query service.
    const NAME: &'static str;

    /// Items requested per round-trip when walking this entity.
    const PAGE_SIZE: PageSize = PageSize::DEFAULT;

    /// An unfiltered query over this entity.
    fn query() -> QuerySpec {
        QuerySpec::new(Self::NAME)
    }
}

/// `count`/`each` entry points for every query service.
pub trait Paginate: PagedQueryService {
    /// A walker using the default page size.
    fn walker(&self) -> PagedQueryWalker<'_, Self> {
        PagedQueryWalker::new(self)
    }

    /// A walker sized for `E`.
    fn walker_for<E: Entity>(&self) -> PagedQueryWalker<'_, Self> {
        PagedQueryWalker::new(self).with_page_size(E::PAGE_SIZE)
    }
}

impl<S: PagedQueryService + ?Sized> Paginate for S {}
