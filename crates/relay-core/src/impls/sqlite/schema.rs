//! Table definitions.

pub(crate) const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS EVENTS (
        ID INTEGER PRIMARY KEY,
        URL TEXT NOT NULL,
        METHOD TEXT NOT NULL DEFAULT 'POST',
        DESCRIPTION TEXT NOT NULL DEFAULT '',
        CREATED_ON TEXT NOT NULL,
        UPDATED_ON TEXT NOT NULL,
        DELETED INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS PARTNERS (
        ID INTEGER PRIMARY KEY,
        IP_ADDRESS TEXT NOT NULL,
        PORT INTEGER NOT NULL,
        DESCRIPTION TEXT NOT NULL DEFAULT '',
        CREATED_ON TEXT NOT NULL,
        UPDATED_ON TEXT NOT NULL,
        DELETED INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS SUBSCRIBERS (
        ID INTEGER PRIMARY KEY,
        EVENT_ID INTEGER NOT NULL,
        PARTNER_ID INTEGER NOT NULL,
        CREATED_ON TEXT NOT NULL,
        UPDATED_ON TEXT NOT NULL,
        DELETED INTEGER NOT NULL DEFAULT 0,
        CONSTRAINT FK_SUBSCRIBERS_EVENT_ID FOREIGN KEY(EVENT_ID) REFERENCES EVENTS(ID),
        CONSTRAINT FK_SUBSCRIBERS_PARTNER_ID FOREIGN KEY(PARTNER_ID) REFERENCES PARTNERS(ID)
    );

    CREATE TABLE IF NOT EXISTS TASKS (
        ID INTEGER PRIMARY KEY,
        LOCAL_ID TEXT NOT NULL,
        PARTNER_ID INTEGER NOT NULL,
        EVENT_ID INTEGER NOT NULL,
        DATA TEXT NOT NULL,
        STATE INTEGER NOT NULL DEFAULT 1,
        CREATED_ON TEXT NOT NULL,
        UPDATED_ON TEXT NOT NULL,
        DELETED INTEGER NOT NULL DEFAULT 0,
        CONSTRAINT FK_TASKS_PARTNER_ID FOREIGN KEY(PARTNER_ID) REFERENCES PARTNERS(ID),
        CONSTRAINT FK_TASKS_EVENT_ID FOREIGN KEY(EVENT_ID) REFERENCES EVENTS(ID)
    );

    CREATE INDEX IF NOT EXISTS IX_TASKS_DUPLICATE ON TASKS(EVENT_ID, PARTNER_ID, LOCAL_ID);
    CREATE INDEX IF NOT EXISTS IX_TASKS_STATE ON TASKS(STATE);

    CREATE TABLE IF NOT EXISTS PROCESSING_STEPS (
        ID INTEGER PRIMARY KEY,
        TASK_ID INTEGER NOT NULL,
        PARTNER_ID INTEGER NOT NULL,
        STATE INTEGER NOT NULL DEFAULT 1,
        CREATED_ON TEXT NOT NULL,
        UPDATED_ON TEXT NOT NULL,
        DELETED INTEGER NOT NULL DEFAULT 0,
        CONSTRAINT FK_PROCESSING_STEPS_TASK_ID FOREIGN KEY(TASK_ID) REFERENCES TASKS(ID),
        CONSTRAINT FK_PROCESSING_STEPS_PARTNER_ID FOREIGN KEY(PARTNER_ID) REFERENCES PARTNERS(ID)
    );

    CREATE INDEX IF NOT EXISTS IX_PROCESSING_STEPS_STATE ON PROCESSING_STEPS(STATE);
";
