use http::StatusCode;

use super::templates::{FormState, Page};
use super::{Application, FLASH_KEY};
use crate::auth::{log_in, log_out};
use crate::error::Error;
use crate::forms::{SnippetCreateForm, UserLoginForm, UserSignupForm};
use crate::models::ModelError;
use crate::session::Session;
use crate::web::{redirect, Request, RequestExt, Response};

fn session(req: &Request) -> Result<Session, Error> {
    req.session()
        .cloned()
        .ok_or_else(|| Error::Fault("handler reached without a session".into()))
}

pub(super) fn home(app: &Application, req: Request) -> Result<Response, Error> {
    let snippets = app.snippets.latest(app.config.latest_limit)?;

    let mut data = app.template_data(&req);
    data.snippets = snippets;
    app.render(StatusCode::OK, Page::Home, &data)
}

pub(super) fn snippet_view(app: &Application, req: Request) -> Result<Response, Error> {
    let id = req
        .path_param("id")
        .and_then(|raw| raw.parse::<i64>().ok())
        .filter(|id| *id >= 1)
        .ok_or(Error::NotFound)?;

    let snippet = match app.snippets.get(id) {
        Ok(snippet) => snippet,
        Err(ModelError::NoRecord) => return Err(Error::NotFound),
        Err(err) => return Err(err.into()),
    };

    let mut data = app.template_data(&req);
    data.snippet = Some(snippet);
    app.render(StatusCode::OK, Page::View, &data)
}

pub(super) fn snippet_create(app: &Application, req: Request) -> Result<Response, Error> {
    let mut data = app.template_data(&req);
    data.form = Some(FormState::SnippetCreate(SnippetCreateForm::default()));
    app.render(StatusCode::OK, Page::Create, &data)
}

pub(super) fn snippet_create_post(app: &Application, req: Request) -> Result<Response, Error> {
    let fields = req.form_data(app.config.max_form_bytes)?;
    let mut form = SnippetCreateForm::from_form_data(&fields)?;

    if !form.validate() {
        let mut data = app.template_data(&req);
        data.form = Some(FormState::SnippetCreate(form));
        return app.render(StatusCode::UNPROCESSABLE_ENTITY, Page::Create, &data);
    }

    let id = app.snippets.insert(&form.title, &form.content, form.expires)?;
    session(&req)?.put(FLASH_KEY, "Snippet successfully created!")?;
    req.log().info(format_args!("snippet {id} created"));
    redirect(&format!("/snippet/view/{id}"))
}

pub(super) fn user_signup(app: &Application, req: Request) -> Result<Response, Error> {
    let mut data = app.template_data(&req);
    data.form = Some(FormState::Signup(UserSignupForm::default()));
    app.render(StatusCode::OK, Page::Signup, &data)
}

pub(super) fn user_signup_post(app: &Application, req: Request) -> Result<Response, Error> {
    let fields = req.form_data(app.config.max_form_bytes)?;
    let mut form = UserSignupForm::from_form_data(&fields)?;

    if form.validate() {
        match app
            .users
            .insert(&form.name, &form.email, form.password.expose_secret())
        {
            Ok(()) => {
                session(&req)?.put(FLASH_KEY, "Your signup was successful. Please log in.")?;
                return redirect(&app.config.login_path);
            }
            Err(ModelError::DuplicateEmail) => {
                form.validator
                    .add_field_error("email", "Email address is already in use");
            }
            Err(err) => return Err(err.into()),
        }
    }

    let mut data = app.template_data(&req);
    data.form = Some(FormState::Signup(form));
    app.render(StatusCode::UNPROCESSABLE_ENTITY, Page::Signup, &data)
}

pub(super) fn user_login(app: &Application, req: Request) -> Result<Response, Error> {
    let mut data = app.template_data(&req);
    data.form = Some(FormState::Login(UserLoginForm::default()));
    app.render(StatusCode::OK, Page::Login, &data)
}

pub(super) fn user_login_post(app: &Application, req: Request) -> Result<Response, Error> {
    let fields = req.form_data(app.config.max_form_bytes)?;
    let mut form = UserLoginForm::from_form_data(&fields)?;

    if form.validate() {
        match app
            .users
            .authenticate(&form.email, form.password.expose_secret())
        {
            Ok(id) => {
                log_in(&session(&req)?, id)?;
                return redirect("/snippet/create");
            }
            Err(ModelError::InvalidCredentials) => {
                req.log().warn(format_args!("failed login attempt"));
                form.validator
                    .add_non_field_error("Email or password is incorrect");
            }
            Err(err) => return Err(err.into()),
        }
    }

    let mut data = app.template_data(&req);
    data.form = Some(FormState::Login(form));
    app.render(StatusCode::UNPROCESSABLE_ENTITY, Page::Login, &data)
}

pub(super) fn user_logout_post(_app: &Application, req: Request) -> Result<Response, Error> {
    let session = session(&req)?;
    log_out(&session)?;
    session.put(FLASH_KEY, "You've been logged out successfully!")?;
    redirect("/")
}
