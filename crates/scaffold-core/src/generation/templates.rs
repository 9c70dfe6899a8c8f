//! Template catalog for generated controller / model / table sources.
//!
//! Placeholders are written `@@name@@`. Python never uses `@@`, so literal
//! dict braces and f-string fields in the bodies pass through untouched.

use std::fmt;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::errors::{ScaffoldError, ScaffoldResult};

pub const PLACEHOLDER_MODEL_NAME: &str = "model_name";
pub const PLACEHOLDER_CONTROLLER_NAME: &str = "controller_name";
pub const PLACEHOLDER_TABLE_NAME: &str = "table_name";
pub const PLACEHOLDER_TABLE_NAME_LOWER: &str = "table_name_lower";

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@@([A-Za-z_][A-Za-z0-9_]*)@@").unwrap());

static GLOBAL_STORE: LazyLock<TemplateStore> = LazyLock::new(TemplateStore::builtin);

/// Render a placeholder token for `name`.
pub fn token(name: &str) -> String {
    format!("@@{name}@@")
}

/// Placeholder names in `body`, de-duplicated, in order of first use.
pub fn placeholders(body: &str) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for caps in PLACEHOLDER_RE.captures_iter(body) {
        let name = caps[1].to_string();
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    Controller,
    AuthenticatedController,
    Model,
    Table,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 4] = [
        TemplateKind::Controller,
        TemplateKind::AuthenticatedController,
        TemplateKind::Model,
        TemplateKind::Table,
    ];

    pub fn key(self) -> &'static str {
        match self {
            TemplateKind::Controller => "controller",
            TemplateKind::AuthenticatedController => "authenticated_controller",
            TemplateKind::Model => "model",
            TemplateKind::Table => "table",
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    pub body: String,
}

/// Immutable catalog of templates keyed by artifact kind.
#[derive(Clone, Debug, Default)]
pub struct TemplateStore {
    templates: IndexMap<TemplateKind, Template>,
}

impl TemplateStore {
    /// The process-wide built-in catalog.
    pub fn global() -> &'static TemplateStore {
        &GLOBAL_STORE
    }

    fn builtin() -> Self {
        Self::with_templates([
            (TemplateKind::Controller, CONTROLLER_TEMPLATE),
            (TemplateKind::AuthenticatedController, AUTHENTICATED_CONTROLLER_TEMPLATE),
            (TemplateKind::Model, MODEL_TEMPLATE),
            (TemplateKind::Table, TABLE_TEMPLATE),
        ])
    }

    /// A custom catalog; each template is named `basic`.
    pub fn with_templates<I, S>(templates: I) -> Self
    where
        I: IntoIterator<Item = (TemplateKind, S)>,
        S: Into<String>,
    {
        let templates = templates
            .into_iter()
            .map(|(kind, body)| {
                (
                    kind,
                    Template {
                        name: "basic".to_string(),
                        body: body.into(),
                    },
                )
            })
            .collect();
        Self { templates }
    }

    pub fn get(&self, kind: TemplateKind) -> ScaffoldResult<&Template> {
        self.templates.get(&kind).ok_or_else(|| {
            ScaffoldError::TemplateResolution(format!("unknown template key '{}'", kind.key()))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (TemplateKind, &Template)> {
        self.templates.iter().map(|(k, t)| (*k, t))
    }
}

// ---------------------------------------------------------------------------
// Built-in bodies
// ---------------------------------------------------------------------------

const CONTROLLER_TEMPLATE: &str = r#"# micro_py_framework controller built on the IController contract
from interface.IController import IController
from helper.Response import Response
from model.@@model_name@@ import @@model_name@@


class @@controller_name@@(IController):
    def __init__(self):
        self.model = @@model_name@@()

    def get(self, data):
        try:
            if data.get("id"):
                result = self.model.single(data["id"])
                if not result:
                    return Response.bad_request(f"Failed to get item: {self.model.error}")
                return Response.success(result)
            result = self.model.list()
            if result is None:
                return Response.bad_request(f"Failed to get items: {self.model.error}")
            return Response.success(result)
        except Exception as e:
            return Response.internal_error(str(e))

    def post(self, data):
        try:
            created = self.model.create(**data)
            if not created:
                return Response.bad_request(f"Failed to create item: {self.model.error}")
            return Response.created({"success": "Item created successfully"})
        except Exception as e:
            return Response.internal_error(str(e))

    def put(self, data):
        try:
            item_id = data.get("id")
            if item_id is None:
                return Response.bad_request("ID is required")
            fields = {k: v for k, v in data.items() if k != "id"}
            updated = self.model.update(item_id, **fields)
            if not updated:
                return Response.bad_request(f"Failed to update item: {self.model.error}")
            return Response.success({"success": "Item updated successfully"})
        except Exception as e:
            return Response.internal_error(str(e))

    def destroy(self, data):
        try:
            item_id = data.get("id") if isinstance(data, dict) else data
            if item_id is None:
                return Response.bad_request("ID is required")
            if not self.model.remove(int(item_id)):
                return Response.bad_request(self.model.error or "Failed to destroy item")
            return Response.deleted({"success": f"Item with ID {item_id} destroyed successfully"})
        except (ValueError, TypeError):
            return Response.bad_request("Invalid item ID format")
        except Exception as e:
            return Response.internal_error(str(e))
"#;

const AUTHENTICATED_CONTROLLER_TEMPLATE: &str = r#"# micro_py_framework controller built on the IController contract, behind AuthController
from helper.AuthController import AuthController
from interface.IController import IController
from helper.Response import Response
from model.@@model_name@@ import @@model_name@@


class @@controller_name@@(AuthController, IController):
    def __init__(self):
        super().__init__()
        self.model = @@model_name@@()

    def get(self, data, headers):
        decoded = self.authenticate(headers)
        if isinstance(decoded, dict) and "status_code" in decoded:
            return decoded

        try:
            if data.get("id"):
                result = self.model.single(data["id"])
                if not result:
                    return Response.bad_request(f"Failed to get item: {self.model.error}")
                return Response.success(result)
            result = self.model.list()
            if result is None:
                return Response.bad_request(f"Failed to get items: {self.model.error}")
            return Response.success(result)
        except Exception as e:
            return Response.internal_error(str(e))

    def post(self, data, headers):
        decoded = self.authenticate(headers)
        if isinstance(decoded, dict) and "status_code" in decoded:
            return decoded

        # auth_result = self.authorize(decoded, required_role="admin")
        # if isinstance(auth_result, dict) and "status_code" in auth_result:
        #     return auth_result

        try:
            created = self.model.create(**data)
            if not created:
                return Response.bad_request(f"Failed to create item: {self.model.error}")
            return Response.created({"success": "Item created successfully"})
        except Exception as e:
            return Response.internal_error(str(e))

    def put(self, data, headers):
        decoded = self.authenticate(headers)
        if isinstance(decoded, dict) and "status_code" in decoded:
            return decoded

        try:
            item_id = data.get("id")
            if item_id is None:
                return Response.bad_request("ID is required")
            fields = {k: v for k, v in data.items() if k != "id"}
            updated = self.model.update(item_id, **fields)
            if not updated:
                return Response.bad_request(f"Failed to update item: {self.model.error}")
            return Response.success({"success": "Item updated successfully"})
        except Exception as e:
            return Response.internal_error(str(e))

    def destroy(self, data, headers):
        decoded = self.authenticate(headers)
        if isinstance(decoded, dict) and "status_code" in decoded:
            return decoded

        try:
            item_id = data.get("id") if isinstance(data, dict) else data
            if item_id is None:
                return Response.bad_request("Missing item ID")
            if not self.model.remove(int(item_id)):
                return Response.bad_request(self.model.error or "Failed to destroy item")
            return Response.deleted({"success": f"Item with ID {item_id} destroyed successfully"})
        except (ValueError, TypeError):
            return Response.bad_request("Invalid item ID format")
        except Exception as e:
            return Response.internal_error(str(e))
"#;

const MODEL_TEMPLATE: &str = r#"# micro_py_framework model built on the IModel contract
from typing import Dict, List, Optional

from sqlalchemy.exc import SQLAlchemyError

from interface.IModel import IModel
from table.DBConnection import DBConnection
from table.@@table_name@@ import @@table_name@@ as @@table_name@@Row


class @@model_name@@(IModel):
    def __init__(self):
        self.Session = DBConnection.Session
        self.error = None

    def create(self, **data) -> bool:
        if not self.__validateData(**data):
            return False
        with self.Session() as session:
            try:
                session.add(@@table_name@@Row(**data))
                session.commit()
                return True
            except SQLAlchemyError as e:
                session.rollback()
                self.error = f"Database failure: {str(e)}"
                return False

    def single(self, id: int) -> Optional[Dict]:
        with self.Session() as session:
            try:
                item = session.query(@@table_name@@Row).filter_by(id=id).first()
                return item.to_dict() if item else None
            except SQLAlchemyError as e:
                self.error = f"Database failure: {str(e)}"
                return None

    def list(self) -> Optional[List[Dict]]:
        with self.Session() as session:
            try:
                items = session.query(@@table_name@@Row).all()
                return [item.to_dict() for item in items]
            except SQLAlchemyError as e:
                self.error = f"Database failure: {str(e)}"
                return None

    def update(self, id: int, **data) -> bool:
        if not self.__validateData(**data):
            return False
        with self.Session() as session:
            try:
                item = session.query(@@table_name@@Row).filter_by(id=id).first()
                if not item:
                    self.error = "Item not found"
                    return False
                for key, value in data.items():
                    setattr(item, key, value)
                session.commit()
                return True
            except SQLAlchemyError as e:
                session.rollback()
                self.error = f"Database failure: {str(e)}"
                return False

    def remove(self, id: int) -> bool:
        with self.Session() as session:
            try:
                item = session.query(@@table_name@@Row).filter_by(id=id).first()
                if not item:
                    self.error = "Item not found"
                    return False
                session.delete(item)
                session.commit()
                return True
            except SQLAlchemyError as e:
                session.rollback()
                self.error = f"Database failure: {str(e)}"
                return False

    def __validateData(self, **data) -> bool:
        return True
"#;

const TABLE_TEMPLATE: &str = r#"# micro_py_framework table mapped through table.DBConnection.Base
from datetime import datetime

from sqlalchemy import Column, DateTime, Integer

from table.DBConnection import Base


class @@table_name@@(Base):
    __tablename__ = '@@table_name_lower@@'

    id = Column(Integer, primary_key=True, autoincrement=True)
    created_at = Column(DateTime, default=datetime.utcnow)
    updated_at = Column(DateTime, default=datetime.utcnow, onupdate=datetime.utcnow)

    def to_dict(self):
        return {
            'id': self.id,
            'created_at': self.created_at.isoformat() if self.created_at else None,
            'updated_at': self.updated_at.isoformat() if self.updated_at else None,
        }
"#;
