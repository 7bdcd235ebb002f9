//! Row-level visibility rules rendered as SQL predicates

use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};

/// Which rows a principal may read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AccessScope {
    /// Directors and superusers
    All,
    /// A teacher profile: their own groups and what hangs off them
    Teacher(i64),
    /// A parent profile: their linked children and what hangs off them
    Parent(i64),
    /// Nothing at all
    Nothing,
}

/// Tables a scope can filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopedEntity {
    Group,
    Student,
    Attendance,
    Parent,
    Teacher,
    Event,
    StudentParent,
}

impl ScopedEntity {
    pub fn table(&self) -> &'static str {
        match self {
            ScopedEntity::Group => "groups",
            ScopedEntity::Student => "students",
            ScopedEntity::Attendance => "attendance",
            ScopedEntity::Parent => "parents",
            ScopedEntity::Teacher => "teachers",
            ScopedEntity::Event => "events",
            ScopedEntity::StudentParent => "student_parents",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScopedEntity::Group => "group",
            ScopedEntity::Student => "student",
            ScopedEntity::Attendance => "attendance",
            ScopedEntity::Parent => "parent",
            ScopedEntity::Teacher => "teacher",
            ScopedEntity::Event => "event",
            ScopedEntity::StudentParent => "student_parent",
        }
    }
}

impl AccessScope {
    pub fn is_all(&self) -> bool {
        matches!(self, AccessScope::All)
    }

    /// Append a boolean predicate restricting `alias` (a row of `entity`)
    /// to this scope. The predicate is parenthesised so it can be joined
    /// with `AND`.
    pub fn push_predicate(&self, qb: &mut QueryBuilder<'_, Postgres>, entity: ScopedEntity, alias: &str) {
        match *self {
            AccessScope::All => {
                qb.push("TRUE");
            }
            AccessScope::Nothing => {
                qb.push("FALSE");
            }
            AccessScope::Teacher(teacher_id) => push_teacher_predicate(qb, entity, alias, teacher_id),
            AccessScope::Parent(parent_id) => push_parent_predicate(qb, entity, alias, parent_id),
        }
    }

    /// Standalone `WHERE` fragment for `entity` aliased as `alias`
    pub fn where_clause(&self, qb: &mut QueryBuilder<'_, Postgres>, entity: ScopedEntity, alias: &str) {
        qb.push(" WHERE ");
        self.push_predicate(qb, entity, alias);
    }
}

fn push_teacher_predicate(
    qb: &mut QueryBuilder<'_, Postgres>,
    entity: ScopedEntity,
    alias: &str,
    teacher_id: i64,
) {
    match entity {
        ScopedEntity::Group => {
            qb.push(format!("({alias}.teacher_id = "));
            qb.push_bind(teacher_id);
            qb.push(")");
        }
        ScopedEntity::Student => {
            qb.push(format!(
                "({alias}.group_id IN (SELECT sc_g.id FROM groups sc_g WHERE sc_g.teacher_id = "
            ));
            qb.push_bind(teacher_id);
            qb.push("))");
        }
        ScopedEntity::Attendance | ScopedEntity::StudentParent => {
            qb.push(format!(
                "({alias}.student_id IN (SELECT sc_s.id FROM students sc_s \
                 JOIN groups sc_g ON sc_g.id = sc_s.group_id WHERE sc_g.teacher_id = "
            ));
            qb.push_bind(teacher_id);
            qb.push("))");
        }
        ScopedEntity::Parent => {
            qb.push(format!(
                "({alias}.id IN (SELECT sc_sp.parent_id FROM student_parents sc_sp \
                 JOIN students sc_s ON sc_s.id = sc_sp.student_id \
                 JOIN groups sc_g ON sc_g.id = sc_s.group_id WHERE sc_g.teacher_id = "
            ));
            qb.push_bind(teacher_id);
            qb.push("))");
        }
        // the staff directory is open to every teacher
        ScopedEntity::Teacher => {
            qb.push("TRUE");
        }
        ScopedEntity::Event => {
            qb.push(format!(
                "(NOT EXISTS (SELECT 1 FROM event_groups sc_eg WHERE sc_eg.event_id = {alias}.id) \
                 OR EXISTS (SELECT 1 FROM event_groups sc_eg JOIN groups sc_g ON sc_g.id = sc_eg.group_id \
                 WHERE sc_eg.event_id = {alias}.id AND sc_g.teacher_id = "
            ));
            qb.push_bind(teacher_id);
            qb.push("))");
        }
    }
}

fn push_parent_predicate(
    qb: &mut QueryBuilder<'_, Postgres>,
    entity: ScopedEntity,
    alias: &str,
    parent_id: i64,
) {
    match entity {
        ScopedEntity::Group => {
            qb.push(format!(
                "({alias}.id IN (SELECT sc_s.group_id FROM students sc_s \
                 JOIN student_parents sc_sp ON sc_sp.student_id = sc_s.id \
                 WHERE sc_s.group_id IS NOT NULL AND sc_sp.parent_id = "
            ));
            qb.push_bind(parent_id);
            qb.push("))");
        }
        ScopedEntity::Student => {
            qb.push(format!(
                "({alias}.id IN (SELECT sc_sp.student_id FROM student_parents sc_sp WHERE sc_sp.parent_id = "
            ));
            qb.push_bind(parent_id);
            qb.push("))");
        }
        ScopedEntity::Attendance => {
            qb.push(format!(
                "({alias}.student_id IN (SELECT sc_sp.student_id FROM student_parents sc_sp WHERE sc_sp.parent_id = "
            ));
            qb.push_bind(parent_id);
            qb.push("))");
        }
        ScopedEntity::Parent => {
            qb.push(format!("({alias}.id = "));
            qb.push_bind(parent_id);
            qb.push(")");
        }
        ScopedEntity::StudentParent => {
            qb.push(format!("({alias}.parent_id = "));
            qb.push_bind(parent_id);
            qb.push(")");
        }
        ScopedEntity::Teacher => {
            qb.push(format!(
                "({alias}.id IN (SELECT sc_g.teacher_id FROM groups sc_g \
                 JOIN students sc_s ON sc_s.group_id = sc_g.id \
                 JOIN student_parents sc_sp ON sc_sp.student_id = sc_s.id \
                 WHERE sc_g.teacher_id IS NOT NULL AND sc_sp.parent_id = "
            ));
            qb.push_bind(parent_id);
            qb.push("))");
        }
        ScopedEntity::Event => {
            qb.push(format!(
                "(NOT EXISTS (SELECT 1 FROM event_groups sc_eg WHERE sc_eg.event_id = {alias}.id) \
                 OR EXISTS (SELECT 1 FROM event_groups sc_eg \
                 JOIN students sc_s ON sc_s.group_id = sc_eg.group_id \
                 JOIN student_parents sc_sp ON sc_sp.student_id = sc_s.id \
                 WHERE sc_eg.event_id = {alias}.id AND sc_sp.parent_id = "
            ));
            qb.push_bind(parent_id);
            qb.push("))");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(scope: AccessScope, entity: ScopedEntity, alias: &str) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM t");
        scope.where_clause(&mut qb, entity, alias);
        qb.sql().to_string()
    }

    #[test]
    fn test_all_and_nothing_are_constant() {
        assert_eq!(render(AccessScope::All, ScopedEntity::Student, "s"), "SELECT 1 FROM t WHERE TRUE");
        assert_eq!(render(AccessScope::Nothing, ScopedEntity::Group, "g"), "SELECT 1 FROM t WHERE FALSE");
    }

    #[test]
    fn test_teacher_scope_restricts_groups_to_own() {
        let sql = render(AccessScope::Teacher(5), ScopedEntity::Group, "g");
        assert_eq!(sql, "SELECT 1 FROM t WHERE (g.teacher_id = $1)");
    }

    #[test]
    fn test_teacher_scope_reaches_students_through_groups() {
        let sql = render(AccessScope::Teacher(5), ScopedEntity::Student, "s");
        assert!(sql.contains("s.group_id IN (SELECT sc_g.id FROM groups sc_g WHERE sc_g.teacher_id = $1)"));

        let sql = render(AccessScope::Teacher(5), ScopedEntity::Attendance, "a");
        assert!(sql.contains("a.student_id IN"));
        assert!(sql.contains("sc_g.teacher_id = $1"));
    }

    #[test]
    fn test_teacher_reads_all_teachers() {
        assert_eq!(render(AccessScope::Teacher(5), ScopedEntity::Teacher, "t"), "SELECT 1 FROM t WHERE TRUE");
    }

    #[test]
    fn test_parent_scope_goes_through_links() {
        let sql = render(AccessScope::Parent(2), ScopedEntity::Student, "s");
        assert!(sql.contains("s.id IN (SELECT sc_sp.student_id FROM student_parents sc_sp WHERE sc_sp.parent_id = $1)"));

        let sql = render(AccessScope::Parent(2), ScopedEntity::Parent, "p");
        assert_eq!(sql, "SELECT 1 FROM t WHERE (p.id = $1)");

        let sql = render(AccessScope::Parent(2), ScopedEntity::Group, "g");
        assert!(sql.contains("g.id IN (SELECT sc_s.group_id"));
    }

    #[test]
    fn test_event_scope_keeps_global_events() {
        for scope in [AccessScope::Teacher(1), AccessScope::Parent(1)] {
            let sql = render(scope, ScopedEntity::Event, "e");
            assert!(sql.contains("NOT EXISTS (SELECT 1 FROM event_groups sc_eg WHERE sc_eg.event_id = e.id)"));
            assert!(sql.ends_with("$1))"));
        }
    }

    #[test]
    fn test_predicate_binds_after_existing_arguments() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM students s WHERE s.fio ILIKE ");
        qb.push_bind("%a%");
        qb.push(" AND ");
        AccessScope::Parent(4).push_predicate(&mut qb, ScopedEntity::Student, "s");
        assert!(qb.sql().contains("sc_sp.parent_id = $2"));
    }
}
