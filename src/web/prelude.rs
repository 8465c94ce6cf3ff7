pub(crate) use crate::error::ApiError;
pub(crate) use crate::web::AppState;
pub(crate) use axum::Json;
pub(crate) use axum::body::Bytes;
pub(crate) use axum::extract::State;
pub(crate) use serde::{Deserialize, Serialize};
pub(crate) use tracing::{debug, error, info, warn};
