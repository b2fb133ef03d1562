//! End-to-end submission tests against an in-process upstream.

mod common;

use assert_json_diff::assert_json_eq;
use common::{closed_addr, MockUpstream, Reply};
use serde_json::{json, Value};
use valet_engine::config::{EngineConfig, LegacyConfig};
use valet_engine::{DiscountTypeConfig, FailureKind, Submission, SubmissionEngine};

fn engine(legacy_endpoint: Option<String>) -> SubmissionEngine {
    let mut config = EngineConfig::default();
    config.http.request_timeout_secs = 5;
    config.http.connect_timeout_secs = 2;
    config.legacy = LegacyConfig {
        endpoint: legacy_endpoint,
        ..Default::default()
    };
    SubmissionEngine::new(&config).unwrap()
}

fn custom_record(template: String, rule: Option<&str>) -> DiscountTypeConfig {
    DiscountTypeConfig {
        code: Some("vip".to_string()),
        jsessionid: Some("SESS42".to_string()),
        referer_url: Some("https://park.example/wx/index".to_string()),
        use_custom_request: true,
        request_template: Some(template),
        response_template: rule.map(str::to_string),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_custom_form_submission_with_note_directives() {
    let upstream = MockUpstream::start(|_| Reply::json(200, json!({"info": {"errmsg": "ok"}}))).await;
    let template = json!({
        "url": upstream.url("/discount/apply"),
        "headers": {"X-Park": "P01"},
        "body": {"plate": "{{plate}}", "vip": "{{vip}}", "guest": "{{name}}"}
    })
    .to_string();
    let record = custom_record(
        template,
        Some(r#"{"success":{"path":"info.errmsg","equals":"ok"},"messagePath":"info.errmsg"}"#),
    );

    let mut submission = Submission::new("粤B12345", "vip");
    submission.name = Some("Lin".to_string());
    submission.note = Some("vip=1&#header{X-Test:1}".to_string());

    let result = engine(None).submit(&record, &submission).await;
    assert!(result.success, "unexpected failure: {result:?}");
    assert_eq!(result.message.as_deref(), Some("ok"));
    assert_eq!(result.error, None);

    let requests = upstream.requests();
    assert_eq!(requests.len(), 1);
    let sent = &requests[0];
    assert_eq!(sent.method, "POST");
    assert_eq!(sent.uri, "/discount/apply");
    assert_eq!(sent.header("x-test"), Some("1"));
    assert_eq!(sent.header("x-park"), Some("P01"));
    assert_eq!(sent.header("cookie"), Some("JSESSIONID=SESS42"));
    assert_eq!(sent.header("referer"), Some("https://park.example/wx/index"));
    assert_eq!(
        sent.header("content-type"),
        Some("application/x-www-form-urlencoded; charset=UTF-8")
    );
    assert_eq!(sent.body, "plate=%E7%B2%A4B12345&vip=1&guest=Lin");
}

#[tokio::test]
async fn test_snippet_template_with_body_directive_sends_json() {
    let upstream = MockUpstream::start(|_| Reply::json(200, json!({"code": 0}))).await;
    let template = format!(
        r#"
        const url = "{}";
        const method = "post";
        const bodyType = "json";
        const body = {{ plate: '{{{{plate}}}}', totalcount: "1", }};
        #body{{adposid=5}}
        "#,
        upstream.url("/api/coupon")
    );
    let record = custom_record(template, Some(r#"{"success":{"path":"code","equals":"0"}}"#));

    let result = engine(None)
        .submit(&record, &Submission::new("A12345", "vip"))
        .await;
    assert!(result.success, "unexpected failure: {result:?}");

    let requests = upstream.requests();
    let body: Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_json_eq!(
        body,
        json!({"plate": "A12345", "totalcount": "1", "adposid": "5"})
    );
    assert_eq!(requests[0].header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn test_get_template_with_jsonp_response() {
    let upstream = MockUpstream::start(|_| {
        Reply::text(
            200,
            r#"callback({"status":"done","msg":"已优惠","next":"https://park.example/paid"})"#,
        )
    })
    .await;
    let template = json!({
        "url": format!("{}?p={{{{plate}}}}", upstream.url("/q")),
        "method": "get",
        "body": {"ignored": "1"}
    })
    .to_string();
    let record = custom_record(
        template,
        Some(
            r#"{"success":{"path":"status","regex":"^done$"},"messagePath":"msg","redirectPath":"next"}"#,
        ),
    );

    let result = engine(None)
        .submit(&record, &Submission::new("A1", "vip"))
        .await;
    assert!(result.success);
    assert_eq!(result.message.as_deref(), Some("已优惠"));
    assert_eq!(result.redirect_url.as_deref(), Some("https://park.example/paid"));

    let sent = &upstream.requests()[0];
    assert_eq!(sent.method, "GET");
    assert_eq!(sent.uri, "/q?p=A1");
    assert!(sent.body.is_empty());
}

#[tokio::test]
async fn test_legacy_submission_extracts_discount_info() {
    let upstream = MockUpstream::start(|_| {
        Reply::json(
            200,
            json!({"info": {
                "plate": "粤B12345",
                "discountcharge": 5,
                "needcharge": "0",
                "entertime": "2026-10-18 08:30:00",
                "staytime": "2小时"
            }}),
        )
    })
    .await;
    let record = DiscountTypeConfig {
        jsessionid: Some("LEG1".to_string()),
        referer_url: Some("https://park.example/ref".to_string()),
        post_params: Some(r#"{"parkid":"P9","businessid":"B2"}"#.to_string()),
        ..Default::default()
    };

    let result = engine(Some(upstream.url("/legacy/apply")))
        .submit(&record, &Submission::new("粤B12345", "std"))
        .await;
    assert!(result.success);
    let info = result.discount_info.expect("discount info");
    assert_eq!(info.discountcharge, 5.0);
    assert_eq!(info.staytime, "2小时");

    let sent = &upstream.requests()[0];
    assert_eq!(sent.method, "POST");
    assert_eq!(sent.header("cookie"), Some("JSESSIONID=LEG1"));
    assert_eq!(sent.header("referer"), Some("https://park.example/ref"));
    let params: Vec<(String, String)> = url::form_urlencoded::parse(sent.body.as_bytes())
        .into_owned()
        .collect();
    assert!(params.contains(&("parkid".to_string(), "P9".to_string())));
    assert!(params.contains(&("businessid".to_string(), "B2".to_string())));
    assert!(params.contains(&("totalcount".to_string(), "1".to_string())));
    assert!(params.contains(&("carNumber".to_string(), "粤B12345".to_string())));
}

#[tokio::test]
async fn test_heuristic_failure_surfaces_errmsg() {
    let upstream =
        MockUpstream::start(|_| Reply::json(400, json!({"info": {"errmsg": "车辆不在场"}}))).await;
    let record = custom_record(json!({"url": upstream.url("/x")}).to_string(), None);

    let result = engine(None)
        .submit(&record, &Submission::new("A1", "vip"))
        .await;
    assert!(!result.success);
    assert_eq!(result.message.as_deref(), Some("车辆不在场"));
    assert!(result.raw_response.is_some());
}

#[tokio::test]
async fn test_upstream_html_under_json_rule() {
    let upstream = MockUpstream::start(|_| Reply::text(503, "<html>maintenance</html>")).await;
    let record = custom_record(
        json!({"url": upstream.url("/x")}).to_string(),
        Some(r#"{"success":{"path":"ok"}}"#),
    );

    let result = engine(None)
        .submit(&record, &Submission::new("A1", "vip"))
        .await;
    assert!(!result.success);
    assert_eq!(result.error, Some(FailureKind::UpstreamParse));
    assert_eq!(result.raw_response.as_deref(), Some("<html>maintenance</html>"));
}

#[tokio::test]
async fn test_broken_template_is_reported_without_calling_upstream() {
    let upstream = MockUpstream::start(|_| Reply::text(200, "")).await;
    let mut record = custom_record("send the discount please".to_string(), None);
    record.post_params = Some(r#"{"parkid":"P9"}"#.to_string());

    let result = engine(Some(upstream.url("/legacy")))
        .submit(&record, &Submission::new("A1", "vip"))
        .await;
    assert!(!result.success);
    assert_eq!(result.error, Some(FailureKind::TemplateParse));
    assert!(upstream.requests().is_empty());
}

#[tokio::test]
async fn test_unreachable_upstream_is_network_failure() {
    let addr = closed_addr().await;
    let record = custom_record(json!({"url": format!("http://{addr}/x")}).to_string(), None);

    let result = engine(None)
        .submit(&record, &Submission::new("A1", "vip"))
        .await;
    assert!(!result.success);
    assert_eq!(result.error, Some(FailureKind::Network));
}

#[tokio::test]
async fn test_render_does_not_send() {
    let upstream = MockUpstream::start(|_| Reply::text(200, "")).await;
    let record = custom_record(
        json!({"url": upstream.url("/x"), "body": "plate={{plate}}"}).to_string(),
        None,
    );
    let mut submission = Submission::new("A1", "vip");
    submission.note = Some("#body{plate=B2&room=301}".to_string());

    let planned = engine(None).prepare(&record, &submission).unwrap();
    assert_eq!(planned.request.body.as_deref(), Some("plate=B2&room=301"));
    assert!(upstream.requests().is_empty());
}
