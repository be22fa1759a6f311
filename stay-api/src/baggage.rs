use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::convert::Infallible;
use stay_shared::baggage::BAGGAGE_HEADER;
use stay_shared::Baggage;

/// Inbound `baggage` header, empty when absent or not valid text.
#[derive(Debug, Clone, Default)]
pub struct RequestBaggage(pub Baggage);

impl<S> FromRequestParts<S> for RequestBaggage
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let baggage = parts
            .headers
            .get(BAGGAGE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(Baggage::from)
            .unwrap_or_default();

        Ok(Self(baggage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Baggage {
        let (mut parts, _) = request.into_parts();
        let RequestBaggage(baggage) = RequestBaggage::from_request_parts(&mut parts, &()).await.unwrap();
        baggage
    }

    #[tokio::test]
    async fn test_header_is_carried_verbatim() {
        let request = Request::builder()
            .header("baggage", "okteto-divert=alice,traceid=1")
            .body(())
            .unwrap();

        let baggage = extract(request).await;
        assert_eq!(baggage.as_str(), "okteto-divert=alice,traceid=1");
        assert_eq!(baggage.divert(), Some("alice"));
    }

    #[tokio::test]
    async fn test_missing_header_is_empty() {
        let baggage = extract(Request::builder().body(()).unwrap()).await;
        assert!(baggage.is_empty());
    }
}
