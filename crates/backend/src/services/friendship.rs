//! Friend-graph state machine.
//!
//! One edge per unordered pair, guarded by the storage uniqueness constraint;
//! states are pending/accepted/declined/blocked, with "none" meaning no edge.
//! For blocked edges the requester column records the blocker. Declined is
//! terminal: a fresh request needs the old edge deleted first.

use chrono::Utc;
use diesel_async::AsyncPgConnection;
use shared_types::{
    FriendEdge, FriendRequestsResponse, FriendStatus, FriendsResponse, FriendshipStatusResponse,
    PendingRequest, UserSummary,
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::db;
use crate::error::ApiError;
use crate::models::UserRow;

/// A losing concurrent insert surfaces the unique index, not a raw database
/// error.
fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<diesel::result::Error>(),
        Some(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        ))
    )
}

/// Recipient-only, pending-only guard shared by accept and decline.
pub fn ensure_can_respond(edge: &FriendEdge, actor: Uuid) -> Result<(), ApiError> {
    if edge.recipient_id != actor {
        return Err(ApiError::forbidden(
            "Only the recipient can respond to this request",
        ));
    }
    if edge.status != FriendStatus::Pending {
        return Err(ApiError::conflict("Friend request is not pending"));
    }
    Ok(())
}

pub fn ensure_can_cancel(edge: &FriendEdge, actor: Uuid) -> Result<(), ApiError> {
    if edge.requester_id != actor {
        return Err(ApiError::forbidden(
            "Only the requester can cancel this request",
        ));
    }
    if edge.status != FriendStatus::Pending {
        return Err(ApiError::conflict("Cannot cancel a non-pending request"));
    }
    Ok(())
}

pub fn ensure_can_remove(edge: &FriendEdge, actor: Uuid) -> Result<(), ApiError> {
    if !edge.involves(actor) {
        return Err(ApiError::forbidden(
            "Only a member of the friendship can remove it",
        ));
    }
    if edge.status != FriendStatus::Accepted {
        return Err(ApiError::conflict("Friendship is not accepted"));
    }
    Ok(())
}

/// Unblock is blocker-only; the blocked party never sees or clears the edge.
pub fn ensure_can_unblock(edge: &FriendEdge, actor: Uuid) -> Result<(), ApiError> {
    if edge.status != FriendStatus::Blocked {
        return Err(ApiError::not_found("Block relationship"));
    }
    if edge.requester_id != actor {
        return Err(ApiError::forbidden("Only the blocker can unblock"));
    }
    Ok(())
}

/// Service for friend-graph transitions and views.
pub struct FriendshipService;

impl FriendshipService {
    /// `none --request--> pending`.
    pub async fn request(
        conn: &mut AsyncPgConnection,
        requester: Uuid,
        recipient: Uuid,
    ) -> Result<FriendEdge, ApiError> {
        if requester == recipient {
            return Err(ApiError::validation(
                "Cannot send a friend request to yourself",
            ));
        }
        if db::users::find_by_id(conn, recipient).await?.is_none() {
            return Err(ApiError::not_found("User"));
        }
        if db::friends::find_between(conn, requester, recipient)
            .await?
            .is_some()
        {
            return Err(ApiError::conflict("Friendship already exists"));
        }

        let row = db::friends::insert(conn, requester, recipient, "pending")
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ApiError::conflict("Friendship already exists")
                } else {
                    ApiError::Internal(e)
                }
            })?;

        Ok(row.try_into()?)
    }

    /// `pending --accept(by recipient)--> accepted`.
    pub async fn accept(
        conn: &mut AsyncPgConnection,
        actor: Uuid,
        edge_id: Uuid,
    ) -> Result<FriendEdge, ApiError> {
        let edge: FriendEdge = db::friends::find_by_id(conn, edge_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Friend request"))?
            .try_into()?;
        ensure_can_respond(&edge, actor)?;

        let row = db::friends::set_status(conn, edge_id, "accepted", Some(Utc::now())).await?;
        Ok(row.try_into()?)
    }

    /// `pending --decline(by recipient)--> declined`.
    pub async fn decline(
        conn: &mut AsyncPgConnection,
        actor: Uuid,
        edge_id: Uuid,
    ) -> Result<FriendEdge, ApiError> {
        let edge: FriendEdge = db::friends::find_by_id(conn, edge_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Friend request"))?
            .try_into()?;
        ensure_can_respond(&edge, actor)?;

        let row = db::friends::set_status(conn, edge_id, "declined", None).await?;
        Ok(row.try_into()?)
    }

    /// `pending --cancel(by requester)--> none`.
    pub async fn cancel(
        conn: &mut AsyncPgConnection,
        actor: Uuid,
        edge_id: Uuid,
    ) -> Result<(), ApiError> {
        let edge: FriendEdge = db::friends::find_by_id(conn, edge_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Friend request"))?
            .try_into()?;
        ensure_can_cancel(&edge, actor)?;

        db::friends::delete(conn, edge_id).await?;
        Ok(())
    }

    /// `accepted --remove(by either party)--> none`.
    pub async fn remove(
        conn: &mut AsyncPgConnection,
        actor: Uuid,
        edge_id: Uuid,
    ) -> Result<(), ApiError> {
        let edge: FriendEdge = db::friends::find_by_id(conn, edge_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Friendship"))?
            .try_into()?;
        ensure_can_remove(&edge, actor)?;

        db::friends::delete(conn, edge_id).await?;
        Ok(())
    }

    /// `any --block(by either party)--> blocked`, deleting the prior edge
    /// first. The blocker lands in the requester column.
    pub async fn block(
        conn: &mut AsyncPgConnection,
        blocker: Uuid,
        target: Uuid,
    ) -> Result<FriendEdge, ApiError> {
        if blocker == target {
            return Err(ApiError::validation("Cannot block yourself"));
        }
        if db::users::find_by_id(conn, target).await?.is_none() {
            return Err(ApiError::not_found("User"));
        }

        if let Some(existing) = db::friends::find_between(conn, blocker, target).await? {
            db::friends::delete(conn, existing.id).await?;
        }

        let row = db::friends::insert(conn, blocker, target, "blocked")
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ApiError::conflict("Block already exists")
                } else {
                    ApiError::Internal(e)
                }
            })?;

        Ok(row.try_into()?)
    }

    /// `blocked --unblock(by blocker only)--> none`.
    pub async fn unblock(
        conn: &mut AsyncPgConnection,
        actor: Uuid,
        target: Uuid,
    ) -> Result<(), ApiError> {
        let edge: FriendEdge = db::friends::find_between(conn, actor, target)
            .await?
            .ok_or_else(|| ApiError::not_found("Block relationship"))?
            .try_into()?;
        ensure_can_unblock(&edge, actor)?;

        db::friends::delete(conn, edge.id).await?;
        Ok(())
    }

    /// Relationship as seen from `me`; "none" when no edge exists.
    pub async fn status(
        conn: &mut AsyncPgConnection,
        me: Uuid,
        other: Uuid,
    ) -> Result<FriendshipStatusResponse, ApiError> {
        match db::friends::find_between(conn, me, other).await? {
            None => Ok(FriendshipStatusResponse {
                status: "none".to_string(),
                edge: None,
                is_requester: false,
            }),
            Some(row) => {
                let edge: FriendEdge = row.try_into()?;
                Ok(FriendshipStatusResponse {
                    status: edge.status.as_str().to_string(),
                    is_requester: edge.requester_id == me,
                    edge: Some(edge),
                })
            }
        }
    }

    /// Accepted friendships resolved to the other party, plus the user's own
    /// block list.
    pub async fn friends_and_blocked(
        conn: &mut AsyncPgConnection,
        me: Uuid,
    ) -> Result<FriendsResponse, ApiError> {
        let accepted = db::friends::list_accepted(conn, me).await?;
        let blocked = db::friends::list_blocked_by(conn, me).await?;

        let mut other_ids: Vec<Uuid> = Vec::new();
        for row in &accepted {
            let edge: FriendEdge = row.clone().try_into()?;
            other_ids.push(edge.other_party(me));
        }
        let blocked_ids: Vec<Uuid> = blocked.iter().map(|row| row.recipient_id).collect();

        let mut all_ids = other_ids.clone();
        all_ids.extend(&blocked_ids);
        let users = resolve_users(conn, &all_ids).await?;

        Ok(FriendsResponse {
            friends: summaries(&other_ids, &users),
            blocked: summaries(&blocked_ids, &users),
        })
    }

    /// Pending requests, split into received and sent.
    pub async fn pending_requests(
        conn: &mut AsyncPgConnection,
        me: Uuid,
    ) -> Result<FriendRequestsResponse, ApiError> {
        let received_rows = db::friends::list_pending_received(conn, me).await?;
        let sent_rows = db::friends::list_pending_sent(conn, me).await?;

        let mut ids: Vec<Uuid> = received_rows.iter().map(|r| r.requester_id).collect();
        ids.extend(sent_rows.iter().map(|r| r.recipient_id));
        let users = resolve_users(conn, &ids).await?;

        let to_requests = |rows: &[crate::models::FriendEdgeRow], pick_requester: bool| {
            rows.iter()
                .filter_map(|row| {
                    let other = if pick_requester {
                        row.requester_id
                    } else {
                        row.recipient_id
                    };
                    users.get(&other).map(|user| PendingRequest {
                        edge_id: row.id,
                        user: user.into(),
                        requested_at: row.created_at,
                    })
                })
                .collect::<Vec<_>>()
        };

        Ok(FriendRequestsResponse {
            received: to_requests(&received_rows, true),
            sent: to_requests(&sent_rows, false),
        })
    }
}

async fn resolve_users(
    conn: &mut AsyncPgConnection,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, UserRow>, ApiError> {
    let rows = db::users::list_by_ids(conn, ids).await?;
    Ok(rows.into_iter().map(|row| (row.id, row)).collect())
}

fn summaries(ids: &[Uuid], users: &HashMap<Uuid, UserRow>) -> Vec<UserSummary> {
    ids.iter()
        .filter_map(|id| users.get(id).map(UserSummary::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(requester: Uuid, recipient: Uuid, status: FriendStatus) -> FriendEdge {
        FriendEdge {
            id: Uuid::new_v4(),
            requester_id: requester,
            recipient_id: recipient,
            status,
            accepted_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn only_the_recipient_can_accept() {
        let requester = Uuid::new_v4();
        let recipient = Uuid::new_v4();
        let pending = edge(requester, recipient, FriendStatus::Pending);

        assert!(ensure_can_respond(&pending, recipient).is_ok());
        assert!(matches!(
            ensure_can_respond(&pending, requester),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn responding_to_a_non_pending_edge_conflicts() {
        let requester = Uuid::new_v4();
        let recipient = Uuid::new_v4();
        let accepted = edge(requester, recipient, FriendStatus::Accepted);

        assert!(matches!(
            ensure_can_respond(&accepted, recipient),
            Err(ApiError::Conflict(_))
        ));
    }

    #[test]
    fn cancel_is_requester_only_and_pending_only() {
        let requester = Uuid::new_v4();
        let recipient = Uuid::new_v4();
        let pending = edge(requester, recipient, FriendStatus::Pending);

        assert!(ensure_can_cancel(&pending, requester).is_ok());
        assert!(matches!(
            ensure_can_cancel(&pending, recipient),
            Err(ApiError::Forbidden(_))
        ));

        let declined = edge(requester, recipient, FriendStatus::Declined);
        assert!(matches!(
            ensure_can_cancel(&declined, requester),
            Err(ApiError::Conflict(_))
        ));
    }

    #[test]
    fn remove_allows_either_party_of_an_accepted_edge() {
        let requester = Uuid::new_v4();
        let recipient = Uuid::new_v4();
        let accepted = edge(requester, recipient, FriendStatus::Accepted);

        assert!(ensure_can_remove(&accepted, requester).is_ok());
        assert!(ensure_can_remove(&accepted, recipient).is_ok());

        let outsider = Uuid::new_v4();
        assert!(matches!(
            ensure_can_remove(&accepted, outsider),
            Err(ApiError::Forbidden(_))
        ));

        let pending = edge(requester, recipient, FriendStatus::Pending);
        assert!(matches!(
            ensure_can_remove(&pending, requester),
            Err(ApiError::Conflict(_))
        ));
    }

    #[test]
    fn unique_violations_map_to_conflict() {
        let db_err = diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            Box::new("duplicate key value violates unique constraint".to_string()),
        );
        assert!(is_unique_violation(&anyhow::Error::from(db_err)));

        let other = diesel::result::Error::NotFound;
        assert!(!is_unique_violation(&anyhow::Error::from(other)));
    }

    #[test]
    fn unblock_is_blocker_only() {
        let blocker = Uuid::new_v4();
        let blocked = Uuid::new_v4();
        let block_edge = edge(blocker, blocked, FriendStatus::Blocked);

        assert!(ensure_can_unblock(&block_edge, blocker).is_ok());
        // The blocked party cannot clear the edge.
        assert!(matches!(
            ensure_can_unblock(&block_edge, blocked),
            Err(ApiError::Forbidden(_))
        ));

        let friendly = edge(blocker, blocked, FriendStatus::Accepted);
        assert!(matches!(
            ensure_can_unblock(&friendly, blocker),
            Err(ApiError::NotFound(_))
        ));
    }
}
