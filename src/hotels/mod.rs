mod delete;
mod filters;
mod form;
mod query;
mod repository;

pub use delete::{DeleteFlow, DeletePhase};
pub use filters::{cities, CategoryFilter, HotelFilters, StatusFilter};
pub use form::{
    FormMode, FormPhase, HotelForm, HotelFormFlow, RefreshCallback, DEFAULT_DESCRIPTION_LANGUAGE,
};
pub use query::{images_first, HotelQuery, HotelQueryLayer, QueryKey, QueryMode, QueryState};
pub use repository::{gallery_path, logo_path, HotelRepository, StagedFile};
