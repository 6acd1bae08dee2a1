use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, post, web};
use common::key::bearer_token;
use logger::RequestOrigin;

use crate::{error::GatewayError, service::gate::AdmissionGate};

/// OpenAI-compatible chat completion behind per-key quotas.
#[post("/completions")]
pub async fn post_chat_completions(
    req: HttpRequest,
    gate: web::Data<Arc<AdmissionGate>>,
    body: web::Bytes,
) -> Result<HttpResponse, GatewayError> {
    let raw_key = presented_key(&req);
    let origin = RequestOrigin::from_request(&req);

    let response = gate.handle(raw_key.as_deref(), &body, &origin).await?;
    Ok(HttpResponse::Ok().json(response))
}

// `Authorization: Bearer` wins over `X-API-Key`.
fn presented_key(req: &HttpRequest) -> Option<String> {
    let headers = req.headers();
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .or_else(|| headers.get("X-API-Key").and_then(|h| h.to_str().ok()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mount_completions,
        service::gate::tests::{BODY, answer, issue_key, setup},
    };
    use actix_web::{App, test as actix_test};
    use db::models::key::ApiKeyLimits;
    use rust_decimal_macros::dec;
    use serde_json::Value;

    #[test]
    fn bearer_header_is_preferred() {
        let req = actix_test::TestRequest::default()
            .insert_header(("Authorization", "Bearer sk_one"))
            .insert_header(("X-API-Key", "sk_two"))
            .to_http_request();
        assert_eq!(presented_key(&req).as_deref(), Some("sk_one"));

        let req = actix_test::TestRequest::default()
            .insert_header(("X-API-Key", "sk_two"))
            .to_http_request();
        assert_eq!(presented_key(&req).as_deref(), Some("sk_two"));

        assert_eq!(presented_key(&actix_test::TestRequest::default().to_http_request()), None);
    }

    #[actix_web::test]
    async fn completion_and_quota_envelopes() {
        let (store, gate) = setup(answer()).await;
        let (_, raw) = issue_key(
            &store,
            ApiKeyLimits {
                total_usage_limit: Some(dec!(0.001)),
                ..Default::default()
            },
            None,
        )
        .await;
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(Arc::new(gate)))
                .service(web::scope("/v1").service(mount_completions())),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/v1/chat/completions")
            .insert_header(("X-API-Key", raw.as_str()))
            .set_payload(BODY)
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["object"], "chat.completion");
        assert_eq!(body["choices"][0]["message"]["role"], "assistant");
        assert_eq!(body["usage"]["total_tokens"], 1500);

        // the first call billed 0.0024, past the 0.001 total limit
        let req = actix_test::TestRequest::post()
            .uri("/v1/chat/completions")
            .insert_header(("Authorization", format!("Bearer {raw}")))
            .set_payload(BODY)
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 429);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["error"]["type"], "quota_exceeded");
        assert_eq!(body["error"]["code"], "usage_limit_exceeded");

        let req = actix_test::TestRequest::post()
            .uri("/v1/chat/completions")
            .set_payload(BODY)
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 401);
    }
}
