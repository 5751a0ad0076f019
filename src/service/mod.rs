//! Record mapping, validation, and insert/update/select against storage.

mod crud;
mod mapper;
mod validation;
pub use crud::CrudService;
pub use mapper::RecordMapper;
pub use validation::RequestValidator;
