//! Pagination module
//!
//! Extracts the next-page cursor from the `Link` response header.
//!
//! # Overview
//!
//! GitHub paginates collections with an RFC 8288 `Link` header:
//!
//! ```text
//! Link: <https://api.github.com/x?page=2>; rel="next", <https://api.github.com/x?page=5>; rel="last"
//! ```
//!
//! Only the `next` target is surfaced. A missing header, a header without a
//! `next` relation and a malformed header all yield no cursor, which callers
//! treat as "last page reached".

mod link;

pub use link::{next_cursor, next_cursor_from_headers, parse_link_header, LinkValue};
