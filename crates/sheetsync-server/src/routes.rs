//! warp filter tree
//!
//! | method & path | handler |
//! |---|---|
//! | `POST /send-license-key` | request a license |
//! | `GET /activate-license-key/{license_id}` | activate it |
//! | `GET/POST /api/v1/workbooks` | list / create |
//! | `GET/PUT /api/v1/workbooks/{id}` | detail / save snapshot |
//! | `GET/POST /api/v1/workbooks/{id}/sheets` | list / add |
//! | `GET/PUT/DELETE /api/v1/workbooks/{id}/sheets/{sheet_id}` | get / rename / delete |
//! | `GET/PUT /api/v1/workbooks/{id}/sheets/{sheet_id}/cells/{row}/{col}` | read / write |
//! | `POST /api/v1/workbooks/{id}/simulate` | what-if batch |
//! | `GET /get-updated-workbook/{id}/{revision}` | long-poll |

use std::convert::Infallible;

use serde::de::DeserializeOwned;
use sheetsync_core::{Credentials, WorkbookService};
use warp::http::{Method, StatusCode};
use warp::{Filter, Rejection, Reply};

use crate::handlers;
use crate::response;

/// Limit for bodies that never carry a snapshot
const SMALL_BODY: u64 = 64 * 1024;

/// Room for the JSON envelope around a snapshot
const ENVELOPE: u64 = 64 * 1024;

/// The complete API
///
/// Paths are matched before methods so an unknown path is a 404 and a known
/// path with the wrong method is a 405.
pub fn routes(service: WorkbookService) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let large_body = u64::try_from(service.config().limits.max_snapshot_bytes)
        .unwrap_or(u64::MAX)
        .saturating_add(ENVELOPE);

    let preflight = warp::method().and_then(|method: Method| async move {
        if method == Method::OPTIONS {
            Ok(response::empty(StatusCode::NO_CONTENT))
        } else {
            Err(warp::reject::not_found())
        }
    });

    let api = preflight
        .or(license_routes(service.clone()))
        .unify()
        .or(workbook_routes(service.clone(), large_body))
        .unify()
        .or(sheet_routes(service.clone()))
        .unify()
        .or(cell_routes(service.clone()))
        .unify()
        .or(simulate_route(service.clone(), large_body))
        .unify()
        .or(wait_route(service))
        .unify();

    warp::header::optional::<String>("origin")
        .and(api.recover(response::recover).unify())
        .map(response::with_cors)
        .with(warp::trace::request())
}

fn with_service(service: WorkbookService) -> impl Filter<Extract = (WorkbookService,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}

/// `Authorization` and `Origin` headers
fn credentials() -> impl Filter<Extract = (Credentials,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(warp::header::optional::<String>("origin"))
        .map(|authorization, origin| Credentials { authorization, origin })
}

fn json_body<T: DeserializeOwned + Send>(limit: u64) -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(limit).and(warp::body::json())
}

fn license_routes(
    service: WorkbookService,
) -> impl Filter<Extract = (warp::reply::Response,), Error = Rejection> + Clone {
    // JSON first: a JSON body also parses as a form with no known fields.
    let body = warp::body::content_length_limit(SMALL_BODY)
        .and(warp::body::json().or(warp::body::form()).unify());

    let send = warp::path!("send-license-key")
        .and(warp::post())
        .and(body)
        .and(with_service(service.clone()))
        .and_then(handlers::send_license_key);

    let activate = warp::path!("activate-license-key" / String)
        .and(warp::get())
        .and(with_service(service))
        .and_then(handlers::activate_license_key);

    send.or(activate).unify()
}

fn workbook_routes(
    service: WorkbookService,
    large_body: u64,
) -> impl Filter<Extract = (warp::reply::Response,), Error = Rejection> + Clone {
    let list = warp::path!("api" / "v1" / "workbooks")
        .and(warp::get())
        .and(credentials())
        .and(with_service(service.clone()))
        .and_then(handlers::list_workbooks);

    let create = warp::path!("api" / "v1" / "workbooks")
        .and(warp::post())
        .and(credentials())
        .and(json_body(large_body))
        .and(with_service(service.clone()))
        .and_then(handlers::create_workbook);

    let detail = warp::path!("api" / "v1" / "workbooks" / String)
        .and(warp::get())
        .and(credentials())
        .and(with_service(service.clone()))
        .and_then(handlers::get_workbook);

    let save = warp::path!("api" / "v1" / "workbooks" / String)
        .and(warp::put())
        .and(credentials())
        .and(json_body(large_body))
        .and(with_service(service))
        .and_then(handlers::save_workbook);

    list.or(create).unify().or(detail).unify().or(save).unify()
}

fn sheet_routes(service: WorkbookService) -> impl Filter<Extract = (warp::reply::Response,), Error = Rejection> + Clone {
    let list = warp::path!("api" / "v1" / "workbooks" / String / "sheets")
        .and(warp::get())
        .and(credentials())
        .and(with_service(service.clone()))
        .and_then(handlers::list_sheets);

    let add = warp::path!("api" / "v1" / "workbooks" / String / "sheets")
        .and(warp::post())
        .and(credentials())
        .and(json_body(SMALL_BODY))
        .and(with_service(service.clone()))
        .and_then(handlers::add_sheet);

    let get = warp::path!("api" / "v1" / "workbooks" / String / "sheets" / u32)
        .and(warp::get())
        .and(credentials())
        .and(with_service(service.clone()))
        .and_then(handlers::get_sheet);

    let rename = warp::path!("api" / "v1" / "workbooks" / String / "sheets" / u32)
        .and(warp::put())
        .and(credentials())
        .and(json_body(SMALL_BODY))
        .and(with_service(service.clone()))
        .and_then(handlers::rename_sheet);

    let delete = warp::path!("api" / "v1" / "workbooks" / String / "sheets" / u32)
        .and(warp::delete())
        .and(credentials())
        .and(with_service(service))
        .and_then(handlers::delete_sheet);

    list.or(add)
        .unify()
        .or(get)
        .unify()
        .or(rename)
        .unify()
        .or(delete)
        .unify()
}

fn cell_routes(service: WorkbookService) -> impl Filter<Extract = (warp::reply::Response,), Error = Rejection> + Clone {
    let get = warp::path!("api" / "v1" / "workbooks" / String / "sheets" / u32 / "cells" / u32 / u32)
        .and(warp::get())
        .and(credentials())
        .and(with_service(service.clone()))
        .and_then(handlers::get_cell);

    let set = warp::path!("api" / "v1" / "workbooks" / String / "sheets" / u32 / "cells" / u32 / u32)
        .and(warp::put())
        .and(credentials())
        .and(json_body(SMALL_BODY))
        .and(with_service(service))
        .and_then(handlers::set_cell);

    get.or(set).unify()
}

fn simulate_route(
    service: WorkbookService,
    large_body: u64,
) -> impl Filter<Extract = (warp::reply::Response,), Error = Rejection> + Clone {
    warp::path!("api" / "v1" / "workbooks" / String / "simulate")
        .and(warp::post())
        .and(credentials())
        .and(json_body(large_body))
        .and(with_service(service))
        .and_then(handlers::simulate)
}

fn wait_route(service: WorkbookService) -> impl Filter<Extract = (warp::reply::Response,), Error = Rejection> + Clone {
    warp::path!("get-updated-workbook" / String / u64)
        .and(warp::get())
        .and(credentials())
        .and(with_service(service))
        .and_then(handlers::get_updated_workbook)
}
