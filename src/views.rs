use handlebars::Handlebars;
use serde::Serialize;

use crate::error::Error;
use crate::gradebook::GradeRecord;
use crate::types::StudentId;

/// A student entry on the selection page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentLink {
    pub name: StudentId,
    pub href: String,
}

impl From<StudentId> for StudentLink {
    fn from(name: StudentId) -> Self {
        let href = format!("/grades/{}", urlencoding::encode(name.as_str()));
        Self { name, href }
    }
}

/// Everything a page needs; the renderer decides how it looks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum View {
    Login {
        error: Option<String>,
    },
    SelectUser {
        admin_name: String,
        students: Vec<StudentLink>,
    },
    Grades {
        admin_name: String,
        student_name: StudentId,
        data: Vec<GradeRecord>,
    },
}

impl View {
    #[must_use]
    pub fn login() -> Self {
        Self::Login { error: None }
    }

    #[must_use]
    pub fn login_error(message: impl Into<String>) -> Self {
        Self::Login {
            error: Some(message.into()),
        }
    }

    #[must_use]
    pub fn select_user(admin_name: impl Into<String>, students: Vec<StudentId>) -> Self {
        Self::SelectUser {
            admin_name: admin_name.into(),
            students: students.into_iter().map(StudentLink::from).collect(),
        }
    }

    #[must_use]
    pub fn template_name(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::SelectUser { .. } => "select_user",
            Self::Grades { .. } => "grades",
        }
    }
}

/// Renders views with the bundled Handlebars templates.
pub struct HandlebarsRenderer {
    handlebars: Handlebars<'static>,
}

impl HandlebarsRenderer {
    /// # Errors
    ///
    /// Returns [`Error::Render`] if a bundled template fails to compile.
    pub fn new() -> Result<Self, Error> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);

        let templates = [
            ("login", include_str!("../templates/login.hbs")),
            ("select_user", include_str!("../templates/select_user.hbs")),
            ("grades", include_str!("../templates/grades.hbs")),
        ];
        for (name, source) in templates {
            handlebars
                .register_template_string(name, source)
                .map_err(|e| Error::Render(format!("template {name}: {e}")))?;
        }

        Ok(Self { handlebars })
    }

    /// # Errors
    ///
    /// Returns [`Error::Render`] if rendering fails.
    pub fn render_html(&self, view: &View) -> Result<String, Error> {
        self.handlebars
            .render(view.template_name(), view)
            .map_err(|e| Error::Render(e.to_string()))
    }
}
