//! Request dispatch and validation.
//!
//! Maps a decoded request onto a user store operation and turns the
//! outcome into a response. Stateless across requests: a store failure
//! becomes an error response on the issuing connection and nothing more.

use std::sync::Arc;

use crate::error::Error;
use crate::types::{Action, Data, Request, Response};
use crate::userstore::UserStore;

pub struct Dispatcher {
    user_store: Arc<dyn UserStore>,
}

impl Dispatcher {
    pub fn new(user_store: Arc<dyn UserStore>) -> Self {
        Self { user_store }
    }

    /// Handle one decoded request, producing the response to send back.
    pub async fn dispatch(&self, request: &Request) -> Response {
        match request.action {
            Action::Register => self.handle_register(request).await,
            Action::Login => self.handle_login(request).await,
            Action::GetUserList => self.handle_get_user_list().await,
            Action::DeleteUser => self.handle_delete_user(request).await,
            Action::GetUserByUsername => self.handle_get_user_by_username(request).await,
            Action::UpdateUser => self.handle_update_user(request).await,
            Action::Unknown => Response::error("unknown action type"),
        }
    }

    async fn handle_register(&self, request: &Request) -> Response {
        let (Some(username), Some(password)) = (
            request.non_empty_field("username"),
            request.non_empty_field("password"),
        ) else {
            return Response::error("username and password are required");
        };
        let email = request.field("email");

        match self.user_store.register(username, password, email).await {
            Ok(()) => Response::success("registration successful"),
            Err(Error::AlreadyExists(_)) => Response::error("username already exists"),
            Err(e) => {
                log::error!("register failed for {}: {}", username, e);
                Response::error("registration failed")
            }
        }
    }

    async fn handle_login(&self, request: &Request) -> Response {
        let (Some(username), Some(password)) = (
            request.non_empty_field("username"),
            request.non_empty_field("password"),
        ) else {
            return Response::error("username and password are required");
        };

        match self.user_store.login(username, password).await {
            Ok(user) => Response::success("login successful").with_data(Data::Profile(user)),
            // One uniform answer for unknown user, wrong password and a
            // corrupt stored record.
            Err(Error::NotFound(_))
            | Err(Error::AuthenticationFailed(_))
            | Err(Error::MalformedRecord(_)) => Response::error("login failed: bad credentials"),
            Err(e) => {
                log::error!("login failed for {}: {}", username, e);
                Response::error("internal server error")
            }
        }
    }

    async fn handle_get_user_list(&self) -> Response {
        match self.user_store.get_all().await {
            Ok(users) => Response::ok().with_data(Data::AccountList(users)),
            Err(e) => {
                log::error!("user list failed: {}", e);
                Response::error("internal server error")
            }
        }
    }

    async fn handle_delete_user(&self, request: &Request) -> Response {
        if let Some(username) = request.non_empty_field("username") {
            match self.user_store.delete_by_username(username).await {
                Ok(()) => Response::success("user deleted"),
                Err(Error::NotFound(_)) => Response::error("delete failed"),
                Err(e) => {
                    log::error!("delete failed for {}: {}", username, e);
                    Response::error("delete failed")
                }
            }
        } else if let Some(raw_id) = request.non_empty_field("userId") {
            let Ok(id) = raw_id.trim().parse::<i64>() else {
                return Response::error("invalid user id");
            };
            match self.user_store.delete_by_id(id).await {
                Ok(()) => Response::success("user deleted"),
                Err(Error::NotFound(_)) => Response::error("delete failed"),
                Err(e) => {
                    log::error!("delete failed for id {}: {}", id, e);
                    Response::error("delete failed")
                }
            }
        } else {
            Response::error("must provide username or id")
        }
    }

    async fn handle_get_user_by_username(&self, request: &Request) -> Response {
        let Some(username) = request.non_empty_field("username") else {
            return Response::error("username required");
        };

        match self.user_store.find_by_username(username).await {
            Ok(Some(user)) => Response::ok().with_data(Data::Account(user)),
            Ok(None) => Response::error("user not found"),
            Err(e) => {
                log::error!("lookup failed for {}: {}", username, e);
                Response::error("internal server error")
            }
        }
    }

    async fn handle_update_user(&self, request: &Request) -> Response {
        let Some(username) = request.non_empty_field("username") else {
            return Response::error("username required");
        };
        let new_password = request.non_empty_field("password");
        let new_email = request.non_empty_field("email");

        if new_password.is_none() && new_email.is_none() {
            return Response::error("no fields to update");
        }

        match self
            .user_store
            .update_info(username, new_password, new_email)
            .await
        {
            Ok(()) => Response::success("user updated"),
            Err(Error::NotFound(_)) => Response::error("update failed"),
            Err(Error::InvalidRequest(_)) => Response::error("no fields to update"),
            Err(e) => {
                log::error!("update failed for {}: {}", username, e);
                Response::error("update failed")
            }
        }
    }
}
