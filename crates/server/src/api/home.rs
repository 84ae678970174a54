use axum::Form;
use axum::extract::State;
use axum::response::{Html, IntoResponse, Redirect};
use minijinja::{Environment, context};
use serde::Deserialize;

use super::AppState;
use crate::error::ServerError;

const HOME_TEMPLATE: &str = include_str!("templates/home.html");

/// Fuel limit for one page render.
const FUEL_LIMIT: u64 = 100_000;

/// Form body of `POST /`.
#[derive(Debug, Deserialize)]
pub struct SubmitForm {
    pub url: String,
}

/// Compile the page templates once, at startup.
pub fn templates() -> Result<Environment<'static>, ServerError> {
    let mut env = Environment::new();
    env.set_fuel(Some(FUEL_LIMIT));
    env.add_template("home.html", HOME_TEMPLATE)
        .map_err(|e| ServerError::Render(format!("syntax error in home.html: {e}")))?;
    Ok(env)
}

fn render_home(
    env: &Environment<'static>,
    items: &[watify_core::WatRecord],
) -> Result<String, ServerError> {
    let template = env
        .get_template("home.html")
        .map_err(|e| ServerError::Render(format!("failed to load home.html: {e}")))?;
    template
        .render(context! { items => items })
        .map_err(|e| ServerError::Render(format!("error rendering home.html: {e}")))
}

/// `GET /` -- today's most recent wats.
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, ServerError> {
    let items = state.pipeline.ingest().recent().await?;
    Ok(Html(render_home(&state.templates, &items)?))
}

/// `POST /` -- queue a new wat and go back to the listing.
pub async fn create(
    State(state): State<AppState>,
    Form(form): Form<SubmitForm>,
) -> Result<impl IntoResponse, ServerError> {
    state.pipeline.ingest().create(&form.url).await?;
    Ok(Redirect::to("/"))
}
