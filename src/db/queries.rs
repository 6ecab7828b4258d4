use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::models::{
    Call, CallAnalytics, CallDirection, CallStatus, ConsultationRequest, ConversationTurn,
    EntitySet, IntentCount, NewCall, NewTurn, Speaker, TransferDecision,
};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn now_str() -> String {
    Utc::now().naive_utc().format(TS_FORMAT).to_string()
}

fn parse_ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, TS_FORMAT).unwrap_or_else(|_| Utc::now().naive_utc())
}

// ── Calls ──

const CALL_COLUMNS: &str = "id, call_sid, phone_number, caller_name, direction, status, duration_seconds, \
     started_at, ended_at, conversation_summary, intent_detected, entities, ai_confidence_score, \
     human_transfer_required, transfer_reason, appointment_requested, follow_up_required";

pub fn create_call(conn: &Connection, call: &NewCall) -> anyhow::Result<Call> {
    let now = now_str();
    conn.execute(
        "INSERT INTO calls (call_sid, phone_number, direction, status, started_at, conversation_summary, intent_detected, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?5)",
        params![
            call.call_sid,
            call.phone_number,
            call.direction.as_str(),
            call.status.as_str(),
            now,
            call.conversation_summary,
            call.intent_detected,
        ],
    )?;

    let id = conn.last_insert_rowid();
    get_call(conn, id)?.ok_or_else(|| anyhow::anyhow!("call {id} missing after insert"))
}

pub fn get_call(conn: &Connection, id: i64) -> anyhow::Result<Option<Call>> {
    let call = conn
        .query_row(
            &format!("SELECT {CALL_COLUMNS} FROM calls WHERE id = ?1"),
            params![id],
            parse_call_row,
        )
        .optional()?;
    Ok(call)
}

pub fn get_call_by_sid(conn: &Connection, call_sid: &str) -> anyhow::Result<Option<Call>> {
    let call = conn
        .query_row(
            &format!("SELECT {CALL_COLUMNS} FROM calls WHERE call_sid = ?1"),
            params![call_sid],
            parse_call_row,
        )
        .optional()?;
    Ok(call)
}

pub fn list_calls(
    conn: &Connection,
    status_filter: Option<&str>,
    limit: i64,
) -> anyhow::Result<Vec<Call>> {
    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match status_filter {
        Some(status) => (
            format!("SELECT {CALL_COLUMNS} FROM calls WHERE status = ?1 ORDER BY id DESC LIMIT ?2"),
            vec![
                Box::new(status.to_string()) as Box<dyn rusqlite::types::ToSql>,
                Box::new(limit),
            ],
        ),
        None => (
            format!("SELECT {CALL_COLUMNS} FROM calls ORDER BY id DESC LIMIT ?1"),
            vec![Box::new(limit) as Box<dyn rusqlite::types::ToSql>],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), parse_call_row)?;

    let mut calls = vec![];
    for row in rows {
        calls.push(row?);
    }
    Ok(calls)
}

pub fn update_call_status(conn: &Connection, id: i64, status: CallStatus) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE calls SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_str(), id],
    )?;
    Ok(count > 0)
}

pub fn complete_call(
    conn: &Connection,
    id: i64,
    duration_seconds: i64,
    summary: Option<&str>,
) -> anyhow::Result<bool> {
    let now = now_str();
    let count = conn.execute(
        "UPDATE calls SET status = ?1, ended_at = ?2, duration_seconds = ?3,
           conversation_summary = COALESCE(?4, conversation_summary), updated_at = ?2
         WHERE id = ?5",
        params![CallStatus::Completed.as_str(), now, duration_seconds, summary, id],
    )?;
    Ok(count > 0)
}

/// Stores the latest turn's analysis on the call. A transfer flag, once
/// raised, stays raised.
pub fn record_turn_analysis(
    conn: &Connection,
    id: i64,
    intent: &str,
    confidence: f64,
    entities: &EntitySet,
    transfer: &TransferDecision,
) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE calls SET intent_detected = ?1, ai_confidence_score = ?2, entities = ?3, updated_at = ?4 WHERE id = ?5",
        params![intent, confidence, entities.to_json(), now_str(), id],
    )?;

    if transfer.should_transfer {
        conn.execute(
            "UPDATE calls SET human_transfer_required = 1, transfer_reason = ?1 WHERE id = ?2",
            params![transfer.reason, id],
        )?;
    }
    Ok(())
}

/// Hands the call to a person: raises the transfer flag with `reason` and
/// moves the call to `transferred`.
pub fn mark_transferred(conn: &Connection, id: i64, reason: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE calls SET human_transfer_required = 1, transfer_reason = ?1, status = ?2, updated_at = ?3
         WHERE id = ?4",
        params![reason, CallStatus::Transferred.as_str(), now_str(), id],
    )?;
    Ok(count > 0)
}

pub fn set_caller_name(conn: &Connection, id: i64, name: &str) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE calls SET caller_name = ?1, updated_at = ?2 WHERE id = ?3",
        params![name, now_str(), id],
    )?;
    Ok(())
}

fn parse_call_row(row: &rusqlite::Row) -> rusqlite::Result<Call> {
    let direction: String = row.get(4)?;
    let status: String = row.get(5)?;
    let started_at: String = row.get(7)?;
    let ended_at: Option<String> = row.get(8)?;
    let entities: String = row.get(11)?;

    Ok(Call {
        id: row.get(0)?,
        call_sid: row.get(1)?,
        phone_number: row.get(2)?,
        caller_name: row.get(3)?,
        direction: CallDirection::parse(&direction),
        status: CallStatus::parse(&status),
        duration_seconds: row.get(6)?,
        started_at: parse_ts(&started_at),
        ended_at: ended_at.as_deref().map(parse_ts),
        conversation_summary: row.get(9)?,
        intent_detected: row.get(10)?,
        entities: EntitySet::from_json(&entities),
        ai_confidence_score: row.get(12)?,
        human_transfer_required: row.get::<_, i32>(13)? != 0,
        transfer_reason: row.get(14)?,
        appointment_requested: row.get::<_, i32>(15)? != 0,
        follow_up_required: row.get::<_, i32>(16)? != 0,
    })
}

// ── Conversation Turns ──

/// Appends a turn with the next gap-free turn number for the call. The
/// number is chosen inside the INSERT itself, so this is safe to call on its
/// own or inside a caller's transaction.
pub fn append_turn(conn: &Connection, call_id: i64, turn: &NewTurn) -> anyhow::Result<ConversationTurn> {
    let created_at = now_str();
    conn.execute(
        "INSERT INTO conversation_turns (call_id, turn_number, speaker, message, intent, entities, confidence_score, created_at)
         SELECT ?1, COALESCE(MAX(turn_number), 0) + 1, ?2, ?3, ?4, ?5, ?6, ?7
         FROM conversation_turns WHERE call_id = ?1",
        params![
            call_id,
            turn.speaker.as_str(),
            turn.message,
            turn.intent,
            turn.entities.to_json(),
            turn.confidence_score,
            created_at,
        ],
    )?;
    let id = conn.last_insert_rowid();
    let turn_number: i64 = conn.query_row(
        "SELECT turn_number FROM conversation_turns WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;

    Ok(ConversationTurn {
        id,
        call_id,
        turn_number,
        speaker: turn.speaker,
        message: turn.message.clone(),
        intent: turn.intent.clone(),
        entities: turn.entities.clone(),
        confidence_score: turn.confidence_score,
        created_at: parse_ts(&created_at),
    })
}

pub fn get_turns(conn: &Connection, call_id: i64) -> anyhow::Result<Vec<ConversationTurn>> {
    let mut stmt = conn.prepare(
        "SELECT id, call_id, turn_number, speaker, message, intent, entities, confidence_score, created_at
         FROM conversation_turns WHERE call_id = ?1 ORDER BY turn_number ASC",
    )?;

    let rows = stmt.query_map(params![call_id], |row| {
        let speaker: String = row.get(3)?;
        let entities: String = row.get(6)?;
        let created_at: String = row.get(8)?;
        Ok(ConversationTurn {
            id: row.get(0)?,
            call_id: row.get(1)?,
            turn_number: row.get(2)?,
            speaker: Speaker::parse(&speaker),
            message: row.get(4)?,
            intent: row.get(5)?,
            entities: EntitySet::from_json(&entities),
            confidence_score: row.get(7)?,
            created_at: parse_ts(&created_at),
        })
    })?;

    let mut turns = vec![];
    for row in rows {
        turns.push(row?);
    }
    Ok(turns)
}

// ── Consultation Requests ──

/// Stores the request and flags the call for follow-up. Runs on the
/// caller's transaction so it commits together with the turn that asked.
pub fn create_consultation_request(tx: &Transaction, request: &ConsultationRequest) -> anyhow::Result<i64> {
    tx.execute(
        "INSERT INTO consultation_requests (call_id, first_name, last_name, phone, service_type, preferred_date, preferred_time, reason_for_visit, source, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            request.call_id,
            request.first_name,
            request.last_name,
            request.phone,
            request.service_type,
            request.preferred_date,
            request.preferred_time,
            request.reason_for_visit,
            request.source,
            now_str(),
        ],
    )?;
    let id = tx.last_insert_rowid();

    tx.execute(
        "UPDATE calls SET appointment_requested = 1, follow_up_required = 1, updated_at = ?1 WHERE id = ?2",
        params![now_str(), request.call_id],
    )?;
    Ok(id)
}

pub fn get_consultation_requests(conn: &Connection, call_id: i64) -> anyhow::Result<Vec<ConsultationRequest>> {
    let mut stmt = conn.prepare(
        "SELECT call_id, first_name, last_name, phone, service_type, preferred_date, preferred_time, reason_for_visit, source
         FROM consultation_requests WHERE call_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![call_id], |row| {
        Ok(ConsultationRequest {
            call_id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            phone: row.get(3)?,
            service_type: row.get(4)?,
            preferred_date: row.get(5)?,
            preferred_time: row.get(6)?,
            reason_for_visit: row.get(7)?,
            source: row.get(8)?,
        })
    })?;

    let mut requests = vec![];
    for row in rows {
        requests.push(row?);
    }
    Ok(requests)
}

// ── Analytics ──

pub fn get_call_analytics(conn: &Connection) -> anyhow::Result<CallAnalytics> {
    let (total_calls, inbound_calls, outbound_calls, completed_calls, transferred_calls, appointment_requests, average_ai_confidence, average_call_duration): (i64, i64, i64, i64, i64, i64, f64, f64) =
        conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(direction = 'inbound'), 0),
                    COALESCE(SUM(direction = 'outbound'), 0),
                    COALESCE(SUM(status = 'completed'), 0),
                    COALESCE(SUM(human_transfer_required), 0),
                    COALESCE(SUM(appointment_requested), 0),
                    COALESCE(AVG(ai_confidence_score), 0.0),
                    COALESCE(AVG(CASE WHEN status = 'completed' THEN duration_seconds END), 0.0)
             FROM calls",
            [],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                ))
            },
        )?;

    let mut stmt = conn.prepare(
        "SELECT intent_detected, COUNT(*) FROM calls WHERE intent_detected IS NOT NULL
         GROUP BY intent_detected ORDER BY COUNT(*) DESC, intent_detected ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(IntentCount {
            intent: row.get(0)?,
            count: row.get(1)?,
        })
    })?;
    let mut intent_distribution = vec![];
    for row in rows {
        intent_distribution.push(row?);
    }

    let ai_success_rate =
        (completed_calls - transferred_calls) as f64 / completed_calls.max(1) as f64 * 100.0;

    Ok(CallAnalytics {
        total_calls,
        inbound_calls,
        outbound_calls,
        completed_calls,
        transferred_calls,
        appointment_requests,
        average_ai_confidence,
        average_call_duration,
        ai_success_rate,
        intent_distribution,
    })
}
