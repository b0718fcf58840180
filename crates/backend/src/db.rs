use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::{
    pooled_connection::{deadpool::Pool, AsyncDieselConnectionManager, ManagerConfig},
    AsyncPgConnection, RunQueryDsl,
};
use uuid::Uuid;

use crate::models::{
    AvailabilityEntryRow, CalendarConnectionRow, FriendEdgeRow, NewAvailabilityEntry,
    NotificationRow, PushEndpointRow, UserRow,
};

pub type DbPool = Pool<AsyncPgConnection>;

async fn establish_tls_connection(config: String) -> diesel::ConnectionResult<AsyncPgConnection> {
    // Set up rustls TLS configuration
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();
    let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);

    // Parse the connection string and connect with TLS
    let (client, connection) = tokio_postgres::connect(&config, tls)
        .await
        .map_err(|e| diesel::ConnectionError::BadConnection(e.to_string()))?;

    // Spawn the connection task
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("Connection error: {}", e);
        }
    });

    // Build the async connection from the tokio-postgres client
    AsyncPgConnection::try_from(client).await
}

pub fn establish_connection_pool() -> anyhow::Result<DbPool> {
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

    let mut manager_config = ManagerConfig::default();
    manager_config.custom_setup =
        Box::new(|url| Box::pin(establish_tls_connection(url.to_string())));

    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new_with_config(
        database_url,
        manager_config,
    );
    let pool = Pool::builder(config).build()?;

    Ok(pool)
}

// User database operations
pub mod users {
    use super::*;

    pub async fn get_by_id(conn: &mut AsyncPgConnection, user_id: Uuid) -> anyhow::Result<UserRow> {
        use crate::schema::users::dsl::*;

        let user = users.filter(id.eq(user_id)).first::<UserRow>(conn).await?;

        Ok(user)
    }

    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
    ) -> anyhow::Result<Option<UserRow>> {
        use crate::schema::users::dsl::*;

        let user = users
            .filter(id.eq(user_id))
            .first::<UserRow>(conn)
            .await
            .optional()?;

        Ok(user)
    }

    pub async fn find_public_by_username(
        conn: &mut AsyncPgConnection,
        name: &str,
    ) -> anyhow::Result<Option<UserRow>> {
        use crate::schema::users::dsl::*;

        let user = users
            .filter(username.eq(name.to_lowercase()))
            .filter(is_public.eq(true))
            .first::<UserRow>(conn)
            .await
            .optional()?;

        Ok(user)
    }

    pub async fn find_public_by_usernames(
        conn: &mut AsyncPgConnection,
        names: &[String],
    ) -> anyhow::Result<Vec<UserRow>> {
        use crate::schema::users::dsl::*;

        let lowered: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();
        let rows = users
            .filter(username.eq_any(lowered))
            .filter(is_public.eq(true))
            .load::<UserRow>(conn)
            .await?;

        Ok(rows)
    }

    pub async fn list_by_ids(
        conn: &mut AsyncPgConnection,
        ids: &[Uuid],
    ) -> anyhow::Result<Vec<UserRow>> {
        use crate::schema::users::dsl::*;

        let rows = users
            .filter(id.eq_any(ids.to_vec()))
            .load::<UserRow>(conn)
            .await?;

        Ok(rows)
    }

    pub async fn search_public(
        conn: &mut AsyncPgConnection,
        game: Option<&str>,
        platform: Option<&str>,
        region_filter: Option<&str>,
        page: i64,
        limit: i64,
    ) -> anyhow::Result<Vec<UserRow>> {
        use crate::schema::users::dsl::*;

        let mut query = users.filter(is_public.eq(true)).into_boxed();

        if let Some(game) = game {
            query = query.filter(preferred_games.contains(vec![Some(game.to_string())]));
        }
        if let Some(platform) = platform {
            query = query.filter(platforms.contains(vec![Some(platform.to_string())]));
        }
        if let Some(region_filter) = region_filter {
            query = query.filter(region.eq(region_filter));
        }

        let rows = query
            .order_by(last_active.desc())
            .limit(limit)
            .offset((page - 1).max(0) * limit)
            .load::<UserRow>(conn)
            .await?;

        Ok(rows)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update_profile(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
        display_name_val: &str,
        bio_val: &str,
        avatar_url_val: Option<&str>,
        preferred_games_val: Vec<Option<String>>,
        platforms_val: Vec<Option<String>>,
        timezone_val: &str,
        region_val: &str,
        is_public_val: bool,
    ) -> anyhow::Result<UserRow> {
        use crate::schema::users::dsl::*;

        let updated = diesel::update(users.filter(id.eq(user_id)))
            .set((
                display_name.eq(display_name_val),
                bio.eq(bio_val),
                avatar_url.eq(avatar_url_val),
                preferred_games.eq(preferred_games_val),
                platforms.eq(platforms_val),
                timezone.eq(timezone_val),
                region.eq(region_val),
                is_public.eq(is_public_val),
                updated_at.eq(Utc::now()),
            ))
            .get_result::<UserRow>(conn)
            .await?;

        Ok(updated)
    }

    pub async fn touch_last_active(
        conn: &mut AsyncPgConnection,
        user_id: Uuid,
    ) -> anyhow::Result<()> {
        use crate::schema::users::dsl::*;

        diesel::update(users.filter(id.eq(user_id)))
            .set(last_active.eq(Utc::now()))
            .execute(conn)
            .await?;

        Ok(())
    }
}

// Availability entry database operations
pub mod availability {
    use super::*;

    pub async fn create(
        conn: &mut AsyncPgConnection,
        new_entry: NewAvailabilityEntry,
    ) -> anyhow::Result<AvailabilityEntryRow> {
        use crate::schema::availability_entries::dsl::*;

        let row = diesel::insert_into(availability_entries)
            .values(&new_entry)
            .get_result::<AvailabilityEntryRow>(conn)
            .await?;

        Ok(row)
    }

    pub async fn find_owned(
        conn: &mut AsyncPgConnection,
        entry_id: Uuid,
        owner: Uuid,
    ) -> anyhow::Result<Option<AvailabilityEntryRow>> {
        use crate::schema::availability_entries::dsl::*;

        let row = availability_entries
            .filter(id.eq(entry_id))
            .filter(owner_id.eq(owner))
            .first::<AvailabilityEntryRow>(conn)
            .await
            .optional()?;

        Ok(row)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update_entry(
        conn: &mut AsyncPgConnection,
        entry_id: Uuid,
        kind_val: &str,
        label_val: &str,
        start_val: DateTime<Utc>,
        end_val: DateTime<Utc>,
        is_recurring_val: bool,
        recurrence_cols: (
            Option<String>,
            Option<i32>,
            Option<Vec<Option<i16>>>,
            Option<DateTime<Utc>>,
        ),
        visible_val: bool,
    ) -> anyhow::Result<AvailabilityEntryRow> {
        use crate::schema::availability_entries::dsl::*;

        let (frequency, interval, days, until) = recurrence_cols;
        let row = diesel::update(availability_entries.filter(id.eq(entry_id)))
            .set((
                kind.eq(kind_val),
                label.eq(label_val),
                start_time.eq(start_val),
                end_time.eq(end_val),
                is_recurring.eq(is_recurring_val),
                recurrence_frequency.eq(frequency),
                recurrence_interval.eq(interval),
                recurrence_days_of_week.eq(days),
                recurrence_until.eq(until),
                visible.eq(visible_val),
                updated_at.eq(Utc::now()),
            ))
            .get_result::<AvailabilityEntryRow>(conn)
            .await?;

        Ok(row)
    }

    pub async fn delete(conn: &mut AsyncPgConnection, entry_id: Uuid) -> anyhow::Result<()> {
        use crate::schema::availability_entries::dsl::*;

        diesel::delete(availability_entries.filter(id.eq(entry_id)))
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Visible entries of any kind for one owner whose stored range overlaps
    /// the window, plus recurring templates that could still produce
    /// occurrences inside it. Ordered by start time.
    pub async fn window_for_owner(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<AvailabilityEntryRow>> {
        use crate::schema::availability_entries::dsl::*;

        let rows = availability_entries
            .filter(owner_id.eq(owner))
            .filter(visible.eq(true))
            .filter(
                start_time
                    .lt(window_end)
                    .and(end_time.gt(window_start))
                    .or(is_recurring.eq(true).and(start_time.lt(window_end)).and(
                        recurrence_until
                            .is_null()
                            .or(recurrence_until.assume_not_null().gt(window_start)),
                    )),
            )
            .order_by(start_time.asc())
            .load::<AvailabilityEntryRow>(conn)
            .await?;

        Ok(rows)
    }

    /// Visible `available` entries for a set of owners, same window semantics
    /// as [`window_for_owner`]. Feeds the overlap engine.
    pub async fn available_in_window(
        conn: &mut AsyncPgConnection,
        owners: &[Uuid],
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<AvailabilityEntryRow>> {
        use crate::schema::availability_entries::dsl::*;

        let rows = availability_entries
            .filter(owner_id.eq_any(owners.to_vec()))
            .filter(kind.eq("available"))
            .filter(visible.eq(true))
            .filter(
                start_time
                    .lt(window_end)
                    .and(end_time.gt(window_start))
                    .or(is_recurring.eq(true).and(start_time.lt(window_end)).and(
                        recurrence_until
                            .is_null()
                            .or(recurrence_until.assume_not_null().gt(window_start)),
                    )),
            )
            .order_by(start_time.asc())
            .load::<AvailabilityEntryRow>(conn)
            .await?;

        Ok(rows)
    }

    pub async fn find_external(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
        source_val: &str,
        event_id: &str,
    ) -> anyhow::Result<Option<AvailabilityEntryRow>> {
        use crate::schema::availability_entries::dsl::*;

        let row = availability_entries
            .filter(owner_id.eq(owner))
            .filter(source.eq(source_val))
            .filter(external_event_id.eq(event_id))
            .first::<AvailabilityEntryRow>(conn)
            .await
            .optional()?;

        Ok(row)
    }

    /// Bulk delete of everything a provider synced for one owner. Runs on
    /// provider disconnect.
    pub async fn delete_by_source(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
        source_val: &str,
    ) -> anyhow::Result<usize> {
        use crate::schema::availability_entries::dsl::*;

        let deleted = diesel::delete(
            availability_entries
                .filter(owner_id.eq(owner))
                .filter(source.eq(source_val)),
        )
        .execute(conn)
        .await?;

        Ok(deleted)
    }
}

// Friend edge database operations
pub mod friends {
    use super::*;

    pub async fn find_by_id(
        conn: &mut AsyncPgConnection,
        edge_id: Uuid,
    ) -> anyhow::Result<Option<FriendEdgeRow>> {
        use crate::schema::friend_edges::dsl::*;

        let row = friend_edges
            .filter(id.eq(edge_id))
            .first::<FriendEdgeRow>(conn)
            .await
            .optional()?;

        Ok(row)
    }

    /// The edge between two users in either direction, if any.
    pub async fn find_between(
        conn: &mut AsyncPgConnection,
        a: Uuid,
        b: Uuid,
    ) -> anyhow::Result<Option<FriendEdgeRow>> {
        use crate::schema::friend_edges::dsl::*;

        let row = friend_edges
            .filter(
                requester_id
                    .eq(a)
                    .and(recipient_id.eq(b))
                    .or(requester_id.eq(b).and(recipient_id.eq(a))),
            )
            .first::<FriendEdgeRow>(conn)
            .await
            .optional()?;

        Ok(row)
    }

    /// Insert a new edge. The unique index over (requester_id, recipient_id)
    /// is the only guard against double-request races; callers map the
    /// violation to a domain conflict.
    pub async fn insert(
        conn: &mut AsyncPgConnection,
        requester: Uuid,
        recipient: Uuid,
        status_val: &str,
    ) -> anyhow::Result<FriendEdgeRow> {
        use crate::schema::friend_edges::dsl::*;

        let row = diesel::insert_into(friend_edges)
            .values((
                requester_id.eq(requester),
                recipient_id.eq(recipient),
                status.eq(status_val),
            ))
            .get_result::<FriendEdgeRow>(conn)
            .await?;

        Ok(row)
    }

    pub async fn set_status(
        conn: &mut AsyncPgConnection,
        edge_id: Uuid,
        status_val: &str,
        accepted_at_val: Option<DateTime<Utc>>,
    ) -> anyhow::Result<FriendEdgeRow> {
        use crate::schema::friend_edges::dsl::*;

        let row = diesel::update(friend_edges.filter(id.eq(edge_id)))
            .set((
                status.eq(status_val),
                accepted_at.eq(accepted_at_val),
                updated_at.eq(Utc::now()),
            ))
            .get_result::<FriendEdgeRow>(conn)
            .await?;

        Ok(row)
    }

    pub async fn delete(conn: &mut AsyncPgConnection, edge_id: Uuid) -> anyhow::Result<()> {
        use crate::schema::friend_edges::dsl::*;

        diesel::delete(friend_edges.filter(id.eq(edge_id)))
            .execute(conn)
            .await?;

        Ok(())
    }

    /// Accepted edges touching the user, either direction.
    pub async fn list_accepted(
        conn: &mut AsyncPgConnection,
        user: Uuid,
    ) -> anyhow::Result<Vec<FriendEdgeRow>> {
        use crate::schema::friend_edges::dsl::*;

        let rows = friend_edges
            .filter(status.eq("accepted"))
            .filter(requester_id.eq(user).or(recipient_id.eq(user)))
            .load::<FriendEdgeRow>(conn)
            .await?;

        Ok(rows)
    }

    /// Blocked edges where the user is the blocker.
    pub async fn list_blocked_by(
        conn: &mut AsyncPgConnection,
        user: Uuid,
    ) -> anyhow::Result<Vec<FriendEdgeRow>> {
        use crate::schema::friend_edges::dsl::*;

        let rows = friend_edges
            .filter(status.eq("blocked"))
            .filter(requester_id.eq(user))
            .load::<FriendEdgeRow>(conn)
            .await?;

        Ok(rows)
    }

    pub async fn list_pending_received(
        conn: &mut AsyncPgConnection,
        user: Uuid,
    ) -> anyhow::Result<Vec<FriendEdgeRow>> {
        use crate::schema::friend_edges::dsl::*;

        let rows = friend_edges
            .filter(status.eq("pending"))
            .filter(recipient_id.eq(user))
            .order_by(created_at.desc())
            .load::<FriendEdgeRow>(conn)
            .await?;

        Ok(rows)
    }

    pub async fn list_pending_sent(
        conn: &mut AsyncPgConnection,
        user: Uuid,
    ) -> anyhow::Result<Vec<FriendEdgeRow>> {
        use crate::schema::friend_edges::dsl::*;

        let rows = friend_edges
            .filter(status.eq("pending"))
            .filter(requester_id.eq(user))
            .order_by(created_at.desc())
            .load::<FriendEdgeRow>(conn)
            .await?;

        Ok(rows)
    }
}

// Notification database operations
pub mod notifications {
    use super::*;

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        conn: &mut AsyncPgConnection,
        target: Uuid,
        title_val: &str,
        body_val: &str,
        category_val: &str,
        payload_val: &str,
        priority_val: &str,
        expires_at_val: DateTime<Utc>,
    ) -> anyhow::Result<NotificationRow> {
        use crate::schema::notifications::dsl::*;

        let row = diesel::insert_into(notifications)
            .values((
                user_id.eq(target),
                title.eq(title_val),
                body.eq(body_val),
                category.eq(category_val),
                payload.eq(payload_val),
                priority.eq(priority_val),
                expires_at.eq(expires_at_val),
            ))
            .get_result::<NotificationRow>(conn)
            .await?;

        Ok(row)
    }

    pub async fn list_for_user(
        conn: &mut AsyncPgConnection,
        user: Uuid,
        page: i64,
        limit: i64,
        unread_only: bool,
        category_val: Option<&str>,
    ) -> anyhow::Result<Vec<NotificationRow>> {
        use crate::schema::notifications::dsl::*;

        let mut query = notifications.filter(user_id.eq(user)).into_boxed();

        if unread_only {
            query = query.filter(is_read.eq(false));
        }
        if let Some(category_val) = category_val {
            query = query.filter(category.eq(category_val.to_string()));
        }

        let rows = query
            .order_by(created_at.desc())
            .limit(limit)
            .offset((page - 1).max(0) * limit)
            .load::<NotificationRow>(conn)
            .await?;

        Ok(rows)
    }

    pub async fn unread_count(conn: &mut AsyncPgConnection, user: Uuid) -> anyhow::Result<i64> {
        use crate::schema::notifications::dsl::*;

        let count = notifications
            .filter(user_id.eq(user))
            .filter(is_read.eq(false))
            .count()
            .get_result::<i64>(conn)
            .await?;

        Ok(count)
    }

    /// Mark all unread notifications read, or only the given ids.
    pub async fn mark_read(
        conn: &mut AsyncPgConnection,
        user: Uuid,
        ids: Option<&[Uuid]>,
    ) -> anyhow::Result<usize> {
        use crate::schema::notifications::dsl::*;

        let now = Utc::now();
        let updated = match ids {
            Some(ids) => {
                diesel::update(
                    notifications
                        .filter(user_id.eq(user))
                        .filter(is_read.eq(false))
                        .filter(id.eq_any(ids.to_vec())),
                )
                .set((is_read.eq(true), read_at.eq(now)))
                .execute(conn)
                .await?
            }
            None => {
                diesel::update(
                    notifications
                        .filter(user_id.eq(user))
                        .filter(is_read.eq(false)),
                )
                .set((is_read.eq(true), read_at.eq(now)))
                .execute(conn)
                .await?
            }
        };

        Ok(updated)
    }

    pub async fn delete_expired(
        conn: &mut AsyncPgConnection,
        now: DateTime<Utc>,
    ) -> anyhow::Result<usize> {
        use crate::schema::notifications::dsl::*;

        let deleted = diesel::delete(notifications.filter(expires_at.lt(now)))
            .execute(conn)
            .await?;

        Ok(deleted)
    }
}

// Push endpoint database operations
pub mod push_endpoints {
    use super::*;

    /// Register or refresh a subscription. `endpoint_url` is unique, so a
    /// browser re-subscribing lands on the same row with fresh keys.
    pub async fn upsert(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
        endpoint: &str,
        p256dh_val: &str,
        auth_val: &str,
    ) -> anyhow::Result<PushEndpointRow> {
        use crate::schema::push_endpoints::dsl::*;

        let row = diesel::insert_into(push_endpoints)
            .values((
                owner_id.eq(owner),
                endpoint_url.eq(endpoint),
                p256dh.eq(p256dh_val),
                auth_key.eq(auth_val),
                is_active.eq(true),
            ))
            .on_conflict(endpoint_url)
            .do_update()
            .set((
                owner_id.eq(owner),
                p256dh.eq(p256dh_val),
                auth_key.eq(auth_val),
                is_active.eq(true),
                last_error.eq(None::<String>),
            ))
            .get_result::<PushEndpointRow>(conn)
            .await?;

        Ok(row)
    }

    pub async fn list_active(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
    ) -> anyhow::Result<Vec<PushEndpointRow>> {
        use crate::schema::push_endpoints::dsl::*;

        let rows = push_endpoints
            .filter(owner_id.eq(owner))
            .filter(is_active.eq(true))
            .load::<PushEndpointRow>(conn)
            .await?;

        Ok(rows)
    }

    /// An endpoint the provider reports as gone stops receiving deliveries.
    pub async fn deactivate(
        conn: &mut AsyncPgConnection,
        endpoint_id: Uuid,
        error: &str,
    ) -> anyhow::Result<()> {
        use crate::schema::push_endpoints::dsl::*;

        diesel::update(push_endpoints.filter(id.eq(endpoint_id)))
            .set((is_active.eq(false), last_error.eq(error)))
            .execute(conn)
            .await?;

        Ok(())
    }

    pub async fn mark_used(
        conn: &mut AsyncPgConnection,
        endpoint_id: Uuid,
    ) -> anyhow::Result<()> {
        use crate::schema::push_endpoints::dsl::*;

        diesel::update(push_endpoints.filter(id.eq(endpoint_id)))
            .set((last_used_at.eq(Utc::now()), last_error.eq(None::<String>)))
            .execute(conn)
            .await?;

        Ok(())
    }

    pub async fn delete_by_endpoint(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
        endpoint: &str,
    ) -> anyhow::Result<usize> {
        use crate::schema::push_endpoints::dsl::*;

        let deleted = diesel::delete(
            push_endpoints
                .filter(owner_id.eq(owner))
                .filter(endpoint_url.eq(endpoint)),
        )
        .execute(conn)
        .await?;

        Ok(deleted)
    }
}

// Calendar connection database operations
pub mod calendar_connections {
    use super::*;

    pub async fn find_for_owner(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
        provider_val: &str,
    ) -> anyhow::Result<Option<CalendarConnectionRow>> {
        use crate::schema::calendar_connections::dsl::*;

        let row = calendar_connections
            .filter(owner_id.eq(owner))
            .filter(provider.eq(provider_val))
            .first::<CalendarConnectionRow>(conn)
            .await
            .optional()?;

        Ok(row)
    }

    pub async fn upsert(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
        provider_val: &str,
        access_token_val: &str,
        refresh_token_val: Option<&str>,
    ) -> anyhow::Result<CalendarConnectionRow> {
        use crate::schema::calendar_connections::dsl::*;

        let row = diesel::insert_into(calendar_connections)
            .values((
                owner_id.eq(owner),
                provider.eq(provider_val),
                access_token.eq(access_token_val),
                refresh_token.eq(refresh_token_val),
                calendar_ids.eq(Vec::<Option<String>>::new()),
                status.eq("connected"),
            ))
            .on_conflict((owner_id, provider))
            .do_update()
            .set((
                access_token.eq(access_token_val),
                refresh_token.eq(refresh_token_val),
                status.eq("connected"),
            ))
            .get_result::<CalendarConnectionRow>(conn)
            .await?;

        Ok(row)
    }

    pub async fn set_calendar_ids(
        conn: &mut AsyncPgConnection,
        connection_id: Uuid,
        ids: &[String],
    ) -> anyhow::Result<()> {
        use crate::schema::calendar_connections::dsl::*;

        let wrapped: Vec<Option<String>> = ids.iter().cloned().map(Some).collect();
        diesel::update(calendar_connections.filter(id.eq(connection_id)))
            .set(calendar_ids.eq(wrapped))
            .execute(conn)
            .await?;

        Ok(())
    }

    pub async fn set_status(
        conn: &mut AsyncPgConnection,
        connection_id: Uuid,
        status_val: &str,
    ) -> anyhow::Result<()> {
        use crate::schema::calendar_connections::dsl::*;

        diesel::update(calendar_connections.filter(id.eq(connection_id)))
            .set(status.eq(status_val))
            .execute(conn)
            .await?;

        Ok(())
    }

    pub async fn mark_synced(
        conn: &mut AsyncPgConnection,
        connection_id: Uuid,
    ) -> anyhow::Result<()> {
        use crate::schema::calendar_connections::dsl::*;

        diesel::update(calendar_connections.filter(id.eq(connection_id)))
            .set(last_synced.eq(Utc::now()))
            .execute(conn)
            .await?;

        Ok(())
    }

    pub async fn delete(
        conn: &mut AsyncPgConnection,
        owner: Uuid,
        provider_val: &str,
    ) -> anyhow::Result<usize> {
        use crate::schema::calendar_connections::dsl::*;

        let deleted = diesel::delete(
            calendar_connections
                .filter(owner_id.eq(owner))
                .filter(provider.eq(provider_val)),
        )
        .execute(conn)
        .await?;

        Ok(deleted)
    }
}
