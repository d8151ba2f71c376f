use actix_web::error::InternalError;
use actix_web::{HttpResponse, Responder, delete, get, post, put, web};
use bus_guide::articles::load_articles;
use bus_guide::circle_store::{AddArticleOutcome, CircleStore, CircleStoreError};
use bus_guide::config::GuideConfig;
use bus_guide::models::{
    ArticleOperation, Circle, CircleStatus, CircleStatusKind, ErrorDetail, MembershipStatus,
    MembershipStatusKind,
};
use bus_guide::proximity::{DEFAULT_NEARBY_THRESHOLD_M, GeoPoint, containing_circles, rank_nearby};
use bus_guide::route_files::{RouteDirectory, RouteFileError};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::error;

pub struct AppState {
    pub circles: CircleStore,
    pub routes: RouteDirectory,
    pub articles_path: PathBuf,
}

impl AppState {
    pub fn new(config: &GuideConfig) -> Self {
        Self {
            circles: CircleStore::new(config.circles_path()),
            routes: RouteDirectory::new(&config.routes_dir),
            articles_path: config.articles_path(),
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::UnprocessableEntity().json(ErrorDetail::new(err.to_string()));
        InternalError::from_response(err, response).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::UnprocessableEntity().json(ErrorDetail::new(err.to_string()));
        InternalError::from_response(err, response).into()
    }))
    .service(get_articles)
    .service(circles_for_article)
    .service(get_circles)
    .service(get_circle)
    .service(create_circle)
    .service(update_circle)
    .service(delete_circle)
    .service(add_article_to_circle)
    .service(remove_article_from_circle)
    .service(list_routes)
    .service(get_route)
    .service(nearby_circles);
}

fn store_error_response(err: CircleStoreError) -> HttpResponse {
    match &err {
        CircleStoreError::NotFound(_) | CircleStoreError::ArticleNotInCircle { .. } => {
            HttpResponse::NotFound().json(ErrorDetail::new(err.to_string()))
        }
        CircleStoreError::AlreadyExists(_) => {
            HttpResponse::Conflict().json(ErrorDetail::new(err.to_string()))
        }
        CircleStoreError::IdMismatch { .. } => {
            HttpResponse::BadRequest().json(ErrorDetail::new(err.to_string()))
        }
        CircleStoreError::Io { .. } | CircleStoreError::Serialization(_) => {
            error!("Circle storage failure: {}", err);
            HttpResponse::InternalServerError()
                .json(ErrorDetail::new("Error accessing circle data"))
        }
    }
}

#[get("/api/articles")]
async fn get_articles(state: web::Data<AppState>) -> impl Responder {
    match load_articles(&state.articles_path) {
        Ok(articles) => HttpResponse::Ok().json(articles),
        Err(err) => {
            error!("{}", err);
            HttpResponse::InternalServerError().json(ErrorDetail::new("Error reading article data"))
        }
    }
}

#[derive(Deserialize)]
pub struct ArticleCirclesQuery {
    pub lang: Option<String>,
}

/// Circles whose radius contains the article's location, closest first.
#[get("/api/articles/{pageid}/circles")]
async fn circles_for_article(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<ArticleCirclesQuery>,
) -> impl Responder {
    let pageid = path.into_inner();

    let articles = match load_articles(&state.articles_path) {
        Ok(articles) => articles,
        Err(err) => {
            error!("{}", err);
            return HttpResponse::InternalServerError()
                .json(ErrorDetail::new("Error reading article data"));
        }
    };

    let Some(article) = articles.iter().find(|article| {
        article.pageid == pageid
            && query
                .lang
                .as_deref()
                .is_none_or(|lang| article.lang == lang)
    }) else {
        return HttpResponse::NotFound().json(ErrorDetail::new("Article not found"));
    };

    let circles = match state.circles.list() {
        Ok(circles) => circles,
        Err(err) => return store_error_response(err),
    };

    HttpResponse::Ok().json(containing_circles(&article.location(), &circles))
}

#[get("/api/circles")]
async fn get_circles(state: web::Data<AppState>) -> impl Responder {
    match state.circles.list() {
        Ok(circles) => HttpResponse::Ok().json(circles),
        Err(err) => store_error_response(err),
    }
}

#[derive(Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lon: f64,
    pub threshold: Option<f64>,
}

#[get("/api/nearby/circles")]
async fn nearby_circles(
    state: web::Data<AppState>,
    query: web::Query<NearbyQuery>,
) -> impl Responder {
    let point = GeoPoint::new(query.lat, query.lon);
    if !point.is_valid() {
        return HttpResponse::BadRequest().json(ErrorDetail::new(
            "lat must be within [-90, 90] and lon within [-180, 180]",
        ));
    }

    let threshold = query.threshold.unwrap_or(DEFAULT_NEARBY_THRESHOLD_M);
    if !threshold.is_finite() || threshold < 0.0 {
        return HttpResponse::BadRequest()
            .json(ErrorDetail::new("threshold must be a non-negative number"));
    }

    match state.circles.list() {
        Ok(circles) => HttpResponse::Ok().json(rank_nearby(&point, &circles, threshold)),
        Err(err) => store_error_response(err),
    }
}

#[get("/api/circles/{circle_id}")]
async fn get_circle(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.circles.get(&path.into_inner()) {
        Ok(circle) => HttpResponse::Ok().json(circle),
        Err(err) => store_error_response(err),
    }
}

#[post("/api/circles")]
async fn create_circle(state: web::Data<AppState>, body: web::Json<Circle>) -> impl Responder {
    match state.circles.create(body.into_inner()) {
        Ok(id) => HttpResponse::Created().json(CircleStatus {
            id,
            status: CircleStatusKind::Created,
        }),
        Err(err) => store_error_response(err),
    }
}

#[put("/api/circles/{circle_id}")]
async fn update_circle(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<Circle>,
) -> impl Responder {
    let circle_id = path.into_inner();

    match state.circles.update(&circle_id, body.into_inner()) {
        Ok(()) => HttpResponse::Ok().json(CircleStatus {
            id: circle_id,
            status: CircleStatusKind::Updated,
        }),
        Err(err) => store_error_response(err),
    }
}

#[delete("/api/circles/{circle_id}")]
async fn delete_circle(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let circle_id = path.into_inner();

    match state.circles.delete(&circle_id) {
        Ok(()) => HttpResponse::Ok().json(CircleStatus {
            id: circle_id,
            status: CircleStatusKind::Deleted,
        }),
        Err(err) => store_error_response(err),
    }
}

#[post("/api/circles/{circle_id}/articles")]
async fn add_article_to_circle(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<ArticleOperation>,
) -> impl Responder {
    let circle_id = path.into_inner();
    let article_id = body.article_id;

    match state.circles.add_article(&circle_id, article_id) {
        Ok(outcome) => HttpResponse::Ok().json(MembershipStatus {
            circle_id,
            article_id,
            status: match outcome {
                AddArticleOutcome::Added => MembershipStatusKind::Added,
                AddArticleOutcome::AlreadyExists => MembershipStatusKind::AlreadyExists,
            },
        }),
        Err(err) => store_error_response(err),
    }
}

#[delete("/api/circles/{circle_id}/articles/{article_id}")]
async fn remove_article_from_circle(
    state: web::Data<AppState>,
    path: web::Path<(String, i64)>,
) -> impl Responder {
    let (circle_id, article_id) = path.into_inner();

    match state.circles.remove_article(&circle_id, article_id) {
        Ok(()) => HttpResponse::Ok().json(MembershipStatus {
            circle_id,
            article_id,
            status: MembershipStatusKind::Removed,
        }),
        Err(err) => store_error_response(err),
    }
}

#[get("/api/routes")]
async fn list_routes(state: web::Data<AppState>) -> impl Responder {
    match state.routes.list_routes() {
        Ok(routes) => HttpResponse::Ok().json(routes),
        Err(err) => {
            error!("{}", err);
            HttpResponse::InternalServerError()
                .json(ErrorDetail::new(format!("Error listing routes: {}", err)))
        }
    }
}

#[get("/api/routes/{route_id}")]
async fn get_route(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match state.routes.get_route(&path.into_inner()) {
        Ok(geojson) => HttpResponse::Ok().json(geojson),
        Err(err @ RouteFileError::NotFound(_)) => {
            HttpResponse::NotFound().json(ErrorDetail::new(err.to_string()))
        }
        Err(err @ RouteFileError::InvalidGeoJson { .. }) => {
            error!("{}", err);
            HttpResponse::InternalServerError().json(ErrorDetail::new("Error parsing route data"))
        }
        Err(err @ RouteFileError::Io { .. }) => {
            error!("{}", err);
            HttpResponse::InternalServerError()
                .json(ErrorDetail::new(format!("Error reading route data: {}", err)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use serde_json::{Value, json};
    use std::path::Path;

    const BUS_100: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"name": "Bus 100", "ref": "100", "from": "Zoologischer Garten", "to": "Alexanderplatz"},
                "geometry": {"type": "MultiLineString", "coordinates": [[[13.3327, 52.5065], [13.4132, 52.5219]]]}
            }
        ]
    }"#;

    fn state_in(dir: &Path) -> web::Data<AppState> {
        let data_dir = dir.join("data");
        let routes_dir = dir.join("routes");
        std::fs::create_dir_all(&data_dir).unwrap();
        std::fs::create_dir_all(&routes_dir).unwrap();
        std::fs::write(routes_dir.join("bus100.geojson"), BUS_100).unwrap();

        let articles = json!([
            {"pageid": 100, "ns": 0, "title": "Fernsehturm", "lat": 52.5208, "lon": 13.4094, "dist": 20.0, "primary": "", "lang": "de"},
            {"pageid": 200, "ns": 0, "title": "Potsdam", "lat": 52.39, "lon": 13.06, "dist": 50.0, "primary": "", "lang": "en"}
        ]);
        std::fs::write(data_dir.join("articles.json"), articles.to_string()).unwrap();

        let config = GuideConfig {
            data_dir,
            routes_dir,
            ..GuideConfig::default()
        };
        web::Data::new(AppState::new(&config))
    }

    fn circle_json(id: &str, lat: f64, lon: f64, radius: f64) -> Value {
        json!({
            "id": id,
            "name": format!("Circle {}", id),
            "center": [lat, lon],
            "radius": radius,
            "color": "#95276E",
            "articles": []
        })
    }

    #[actix_web::test]
    async fn test_circle_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let app =
            test::init_service(App::new().app_data(state_in(dir.path())).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/api/circles")
            .set_json(circle_json("a", 52.52, 13.405, 200.0))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"id": "a", "status": "created"}));

        let req = test::TestRequest::post()
            .uri("/api/circles")
            .set_json(circle_json("a", 52.52, 13.405, 200.0))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::get().uri("/api/circles/a").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["center"], json!([52.52, 13.405]));

        let req = test::TestRequest::put()
            .uri("/api/circles/a")
            .set_json(circle_json("b", 52.52, 13.405, 200.0))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::put()
            .uri("/api/circles/a")
            .set_json(circle_json("a", 52.52, 13.405, 350.0))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"id": "a", "status": "updated"}));

        let req = test::TestRequest::get().uri("/api/circles").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body[0]["radius"], json!(350.0));

        let req = test::TestRequest::delete().uri("/api/circles/a").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!({"id": "a", "status": "deleted"}));

        let req = test::TestRequest::get().uri("/api/circles/a").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"detail": "Circle not found"}));
    }

    #[actix_web::test]
    async fn test_article_membership_endpoints() {
        let dir = tempfile::tempdir().unwrap();
        let app =
            test::init_service(App::new().app_data(state_in(dir.path())).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/api/circles")
            .set_json(circle_json("mitte", 52.52, 13.405, 500.0))
            .to_request();
        test::call_service(&app, req).await;

        let add = |article_id: i64| {
            test::TestRequest::post()
                .uri("/api/circles/mitte/articles")
                .set_json(json!({"article_id": article_id}))
                .to_request()
        };

        let body: Value = test::call_and_read_body_json(&app, add(100)).await;
        assert_eq!(body["status"], "added");
        let body: Value = test::call_and_read_body_json(&app, add(100)).await;
        assert_eq!(body["status"], "already_exists");

        let req = test::TestRequest::delete()
            .uri("/api/circles/mitte/articles/100")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            body,
            json!({"circle_id": "mitte", "article_id": 100, "status": "removed"})
        );

        let req = test::TestRequest::delete()
            .uri("/api/circles/mitte/articles/100")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["detail"], "Article not found in circle");

        let req = test::TestRequest::post()
            .uri("/api/circles/ghost/articles")
            .set_json(json!({"article_id": 1}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::post()
            .uri("/api/circles/mitte/articles")
            .set_json(json!({"article": 1}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn test_nearby_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let app =
            test::init_service(App::new().app_data(state_in(dir.path())).configure(config)).await;

        for circle in [
            circle_json("b", 52.53, 13.41, 5000.0),
            circle_json("a", 52.52, 13.405, 200.0),
        ] {
            let req = test::TestRequest::post()
                .uri("/api/circles")
                .set_json(circle)
                .to_request();
            test::call_service(&app, req).await;
        }

        let req = test::TestRequest::get()
            .uri("/api/nearby/circles?lat=52.521&lon=13.406")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["circle"]["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(body[0]["distance"].as_f64().unwrap() < 200.0);

        let req = test::TestRequest::get()
            .uri("/api/nearby/circles?lat=53.0&lon=14.0&threshold=1000")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!([]));

        let req = test::TestRequest::get()
            .uri("/api/nearby/circles?lat=95.0&lon=14.0")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/api/nearby/circles?lat=52.5&lon=13.4&threshold=-1")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get()
            .uri("/api/nearby/circles?lat=52.5")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[actix_web::test]
    async fn test_circle_named_nearby_is_reachable() {
        let dir = tempfile::tempdir().unwrap();
        let app =
            test::init_service(App::new().app_data(state_in(dir.path())).configure(config)).await;

        let req = test::TestRequest::post()
            .uri("/api/circles")
            .set_json(circle_json("nearby", 52.52, 13.405, 200.0))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let req = test::TestRequest::get()
            .uri("/api/circles/nearby")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["id"], "nearby");

        let req = test::TestRequest::delete()
            .uri("/api/circles/nearby")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_article_endpoints() {
        let dir = tempfile::tempdir().unwrap();
        let app =
            test::init_service(App::new().app_data(state_in(dir.path())).configure(config)).await;

        let req = test::TestRequest::get().uri("/api/articles").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 2);

        for circle in [
            circle_json("alex", 52.5219, 13.4132, 800.0),
            circle_json("zoo", 52.5065, 13.3327, 800.0),
        ] {
            let req = test::TestRequest::post()
                .uri("/api/circles")
                .set_json(circle)
                .to_request();
            test::call_service(&app, req).await;
        }

        let req = test::TestRequest::get()
            .uri("/api/articles/100/circles")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["circle"]["id"], "alex");

        let req = test::TestRequest::get()
            .uri("/api/articles/100/circles?lang=en")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get()
            .uri("/api/articles/200/circles")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, json!([]));
    }

    #[actix_web::test]
    async fn test_route_endpoints() {
        let dir = tempfile::tempdir().unwrap();
        let app =
            test::init_service(App::new().app_data(state_in(dir.path())).configure(config)).await;

        let req = test::TestRequest::get().uri("/api/routes").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(
            body,
            json!([{
                "id": "100",
                "file": "bus100.geojson",
                "name": "Bus 100",
                "ref": "100",
                "from": "Zoologischer Garten",
                "to": "Alexanderplatz"
            }])
        );

        let req = test::TestRequest::get().uri("/api/routes/100").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["type"], "FeatureCollection");

        let req = test::TestRequest::get().uri("/api/routes/245").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"detail": "Route 245 not found"}));

        std::fs::write(dir.path().join("routes").join("bus300.geojson"), "{ nope").unwrap();
        let req = test::TestRequest::get().uri("/api/routes/300").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
