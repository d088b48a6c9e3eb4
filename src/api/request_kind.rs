use axum::{extract::FromRequestParts, http::request::Parts};
use std::convert::Infallible;

/// Header set by the in-page script on every fetch.
pub const REQUESTED_WITH: &str = "x-requested-with";

/// Whether the request came from the in-page script or a browser navigation.
/// Script-driven requests get JSON; navigations get a rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Script,
    Page,
}

impl RequestKind {
    #[must_use]
    pub const fn wants_json(self) -> bool {
        matches!(self, Self::Script)
    }
}

impl<S> FromRequestParts<S> for RequestKind
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let scripted = parts
            .headers
            .get(REQUESTED_WITH)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"));

        Ok(if scripted { Self::Script } else { Self::Page })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn kind_of(request: Request<()>) -> RequestKind {
        let (mut parts, ()) = request.into_parts();
        RequestKind::from_request_parts(&mut parts, &()).await.unwrap()
    }

    #[tokio::test]
    async fn header_marks_script_requests() {
        let scripted = Request::builder()
            .header("X-Requested-With", "XMLHttpRequest")
            .body(())
            .unwrap();
        assert_eq!(kind_of(scripted).await, RequestKind::Script);

        let plain = Request::builder().body(()).unwrap();
        assert_eq!(kind_of(plain).await, RequestKind::Page);

        let other = Request::builder()
            .header("X-Requested-With", "fetch")
            .body(())
            .unwrap();
        assert_eq!(kind_of(other).await, RequestKind::Page);
    }
}
