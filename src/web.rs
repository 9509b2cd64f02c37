use std::{convert::Infallible, net::SocketAddr};

use async_graphql::http::GraphiQLSource;
use async_graphql_warp::{GraphQLBadRequest, GraphQLResponse};
use tracing::info;
use warp::{http::StatusCode, Filter, Rejection, Reply};

use crate::{api::Schema, database::UserId};

/// The header carrying the id of the user a request acts for.
const USER_HEADER: &str = "x-user-id";

pub(crate) async fn serve(schema: Schema, addr: SocketAddr) {
    info!("Listening on {addr}");
    warp::serve(routes(schema)).run(addr).await;
}

fn routes(schema: Schema) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let graphql = warp::path("graphql")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::header::optional::<u64>(USER_HEADER))
        .and(async_graphql_warp::graphql(schema))
        .and_then(
            |user: Option<u64>, (schema, mut request): (Schema, async_graphql::Request)| async move {
                if let Some(id) = user {
                    request = request.data(UserId(id));
                }
                Ok::<_, Infallible>(GraphQLResponse::from(schema.execute(request).await))
            },
        );

    let graphiql = warp::path("graphql")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::html(GraphiQLSource::build().endpoint("/graphql").finish()));

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| "ok");

    graphql
        .or(graphiql)
        .or(health)
        .recover(recover)
        .with(warp::trace::request())
}

async fn recover(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_string())
    } else if let Some(GraphQLBadRequest(e)) = err.find() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidHeader>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("unhandled rejection: {err:?}"),
        )
    };
    Ok(warp::reply::with_status(message, status))
}
