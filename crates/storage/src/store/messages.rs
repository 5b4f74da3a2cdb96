#![forbid(unsafe_code)]

use super::*;

const MESSAGE_COLUMNS: &str = "id, sender, recipient, kind, content, summary, request_id, \
     approve, created_at_ms, delivered";

impl TeamLedger {
    /// Appends a message to the inbox. The record is immutable once stored;
    /// delivery is tracked as a side flag, never as a content mutation.
    pub fn store_message(
        &mut self,
        request: SendMessageRequest,
    ) -> Result<MessageRecord, StoreError> {
        let now_ms = now_ms();
        let conn = self.conn_mut()?;
        let tx = conn.transaction()?;

        let seq = next_counter_tx(&tx, "message_seq")?;
        let id = format!("MSG-{seq:06}");

        tx.execute(
            "INSERT INTO messages(id, sender, recipient, kind, content, summary, \
                                  request_id, approve, created_at_ms, delivered) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0)",
            params![
                id,
                request.sender,
                request.recipient,
                request.kind,
                request.content,
                request.summary,
                request.request_id,
                request.approve.map(i64::from),
                now_ms
            ],
        )?;

        tx.commit()?;
        Ok(MessageRecord {
            id,
            sender: request.sender,
            recipient: request.recipient,
            kind: request.kind,
            content: request.content,
            summary: request.summary,
            request_id: request.request_id,
            approve: request.approve,
            created_at_ms: now_ms,
            delivered: false,
        })
    }

    /// All messages addressed to `recipient`, oldest first. The empty key
    /// reads the broadcast inbox; there is no implicit fan-out of
    /// broadcasts to named recipients.
    pub fn retrieve_messages(&self, recipient: &str) -> Result<Vec<MessageRecord>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE recipient=?1 \
             ORDER BY created_at_ms ASC, id ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params![recipient])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(read_message(row)?);
        }
        Ok(out)
    }

    pub fn mark_message_delivered(&mut self, message_id: &str) -> Result<bool, StoreError> {
        let conn = self.conn_mut()?;
        let changed = conn.execute(
            "UPDATE messages SET delivered=1 WHERE id=?1",
            params![message_id],
        )?;
        Ok(changed > 0)
    }

    /// Destructive bulk erase, for lifecycle resets such as team teardown.
    /// Returns the number of messages removed.
    pub fn clear_messages(&mut self) -> Result<usize, StoreError> {
        let conn = self.conn_mut()?;
        let deleted = conn.execute("DELETE FROM messages", [])?;
        Ok(deleted)
    }
}

fn read_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRecord> {
    let approve: Option<i64> = row.get(7)?;
    let delivered: i64 = row.get(9)?;
    Ok(MessageRecord {
        id: row.get(0)?,
        sender: row.get(1)?,
        recipient: row.get(2)?,
        kind: row.get(3)?,
        content: row.get(4)?,
        summary: row.get(5)?,
        request_id: row.get(6)?,
        approve: approve.map(|value| value != 0),
        created_at_ms: row.get(8)?,
        delivered: delivered != 0,
    })
}
