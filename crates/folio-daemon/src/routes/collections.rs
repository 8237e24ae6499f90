//! Watchlist and notes CRUD. Caps come from config and are enforced before
//! anything is written.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use folio_schemas::{Note, WatchlistEntry};
use uuid::Uuid;

use crate::api_types::{NoteRequest, NotesResponse, WatchlistAddRequest, WatchlistResponse};
use crate::state::AppState;

use super::{bad_request, limit_refused, not_found, store_error, AuthedUser};

// ---------------------------------------------------------------------------
// GET /v1/watchlist
// ---------------------------------------------------------------------------

pub(crate) async fn list_watchlist(State(st): State<Arc<AppState>>, user: AuthedUser) -> Response {
    match st.watchlist.list_entries(user.user_id).await {
        Ok(entries) => (StatusCode::OK, Json(WatchlistResponse { entries })).into_response(),
        Err(e) => store_error(e),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/watchlist
// ---------------------------------------------------------------------------

pub(crate) async fn add_watchlist(
    State(st): State<Arc<AppState>>,
    user: AuthedUser,
    Json(req): Json<WatchlistAddRequest>,
) -> Response {
    let symbol = req.symbol.trim().to_ascii_uppercase();
    if symbol.is_empty() || symbol == "-" {
        return bad_request("invalid symbol");
    }

    match st.watchlist.count_entries(user.user_id).await {
        Ok(n) if n >= st.limits.max_watchlist_items => {
            return limit_refused("max_watchlist_items", st.limits.max_watchlist_items);
        }
        Ok(_) => {}
        Err(e) => return store_error(e),
    }

    let entry = WatchlistEntry {
        entry_id: Uuid::new_v4(),
        user_id: user.user_id,
        symbol,
        added_at_utc: Utc::now(),
    };
    match st.watchlist.insert_entry(&entry).await {
        Ok(()) => (StatusCode::CREATED, Json(entry)).into_response(),
        Err(e) => store_error(e),
    }
}

// ---------------------------------------------------------------------------
// DELETE /v1/watchlist/:id
// ---------------------------------------------------------------------------

pub(crate) async fn remove_watchlist(
    State(st): State<Arc<AppState>>,
    user: AuthedUser,
    Path(entry_id): Path<Uuid>,
) -> Response {
    match st.watchlist.remove_entry(user.user_id, entry_id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found("watchlist entry not found"),
        Err(e) => store_error(e),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/notes
// ---------------------------------------------------------------------------

pub(crate) async fn list_notes(State(st): State<Arc<AppState>>, user: AuthedUser) -> Response {
    match st.notes.list_notes(user.user_id).await {
        Ok(notes) => (StatusCode::OK, Json(NotesResponse { notes })).into_response(),
        Err(e) => store_error(e),
    }
}

// ---------------------------------------------------------------------------
// POST /v1/notes
// ---------------------------------------------------------------------------

pub(crate) async fn create_note(
    State(st): State<Arc<AppState>>,
    user: AuthedUser,
    Json(req): Json<NoteRequest>,
) -> Response {
    if req.title.trim().is_empty() {
        return bad_request("note title must not be empty");
    }

    match st.notes.count_notes(user.user_id).await {
        Ok(n) if n >= st.limits.max_notes => {
            return limit_refused("max_notes", st.limits.max_notes);
        }
        Ok(_) => {}
        Err(e) => return store_error(e),
    }

    let now = Utc::now();
    let note = Note {
        note_id: Uuid::new_v4(),
        user_id: user.user_id,
        title: req.title,
        body: req.body,
        created_at_utc: now,
        updated_at_utc: now,
    };
    match st.notes.insert_note(&note).await {
        Ok(()) => (StatusCode::CREATED, Json(note)).into_response(),
        Err(e) => store_error(e),
    }
}

// ---------------------------------------------------------------------------
// PUT /v1/notes/:id
// ---------------------------------------------------------------------------

pub(crate) async fn update_note(
    State(st): State<Arc<AppState>>,
    user: AuthedUser,
    Path(note_id): Path<Uuid>,
    Json(req): Json<NoteRequest>,
) -> Response {
    if req.title.trim().is_empty() {
        return bad_request("note title must not be empty");
    }

    match st
        .notes
        .update_note(user.user_id, note_id, &req.title, &req.body)
        .await
    {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found("note not found"),
        Err(e) => store_error(e),
    }
}

// ---------------------------------------------------------------------------
// DELETE /v1/notes/:id
// ---------------------------------------------------------------------------

pub(crate) async fn delete_note(
    State(st): State<Arc<AppState>>,
    user: AuthedUser,
    Path(note_id): Path<Uuid>,
) -> Response {
    match st.notes.delete_note(user.user_id, note_id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found("note not found"),
        Err(e) => store_error(e),
    }
}
