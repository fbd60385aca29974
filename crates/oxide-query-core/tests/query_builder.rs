//! SQL and bindings produced by full builder chains.

mod common;
use common::*;

use oxide_query_core::{
    raw, sub, BuildError, Clause, Condition, Direction, Expression, Record, SqlValue, ToSqlValue,
};

#[test]
fn empty_builder_selects_star() {
    let (db, _) = setup();
    assert_eq!(db.query().to_sql(), "SELECT *");
}

#[test]
fn first_connective_is_stripped() {
    let (db, _) = setup();
    let (sql, bindings) = db
        .table("t")
        .where_eq("a", 1)
        .or_where_eq("b", 2)
        .build()
        .unwrap();
    assert_eq!(sql, "SELECT * FROM `t` WHERE `a` = ? OR `b` = ?");
    assert_eq!(bindings, vec![SqlValue::Int(1), SqlValue::Int(2)]);
}

#[test]
fn raw_sub_queries_keep_their_binding() {
    let (db, _) = setup();
    let (sql, bindings) = db
        .table("t")
        .where_in_sub("id", Expression::with_binding("SELECT id FROM s WHERE v = ?", 5))
        .build()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT * FROM `t` WHERE `id` IN (SELECT id FROM s WHERE v = ?)"
    );
    assert_eq!(bindings, vec![SqlValue::Int(5)]);

    let (sql, bindings) = db
        .query()
        .from_sub(Expression::with_binding("SELECT * FROM s WHERE v = ?", 7), "x")
        .where_eq("x.k", 1)
        .build()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT * FROM (SELECT * FROM s WHERE v = ?) AS `x` WHERE `x`.`k` = ?"
    );
    assert_eq!(bindings, vec![SqlValue::Int(7), SqlValue::Int(1)]);

    let (sql, bindings) = db
        .table("t")
        .where_exists(Expression::with_binding("SELECT 1 FROM s WHERE v = ?", 2))
        .union(Expression::with_binding("SELECT * FROM u WHERE v = ?", 3))
        .build()
        .unwrap();
    assert_eq!(sql.matches('?').count(), bindings.len());
    assert_eq!(bindings, vec![SqlValue::Int(2), SqlValue::Int(3)]);
}

#[test]
fn nested_group() {
    let (db, _) = setup();
    let (sql, bindings) = db
        .table("t")
        .where_group(|q| q.where_eq("a", 1).or_where_eq("b", 2))
        .build()
        .unwrap();
    assert_eq!(sql, "SELECT * FROM `t` WHERE (`a` = ? OR `b` = ?)");
    assert_eq!(bindings, vec![SqlValue::Int(1), SqlValue::Int(2)]);
}

#[test]
fn where_in_sub_bindings_follow_parent() {
    let (db, _) = setup();
    let orders = db
        .table("orders")
        .select(["user_id"])
        .where_cmp("total", ">", 100);
    let (sql, bindings) = db
        .table("users")
        .where_eq("active", true)
        .where_in_sub("id", orders)
        .build()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT * FROM `users` WHERE `active` = ? AND `id` IN (SELECT `user_id` FROM `orders` WHERE `total` > ?)"
    );
    assert_eq!(bindings, vec![SqlValue::Bool(true), SqlValue::Int(100)]);
}

#[test]
fn every_where_form() {
    let (db, _) = setup();
    let (sql, bindings) = db
        .table("users")
        .where_many([
            Condition::eq("status", "active"),
            Condition::new("age", ">=", 18),
        ])
        .where_in("role", ["admin", "editor"])
        .where_not_in("id", Vec::<i64>::new())
        .where_null("deleted_at")
        .or_where_not_null("verified_at")
        .where_between("score", 10, 20)
        .where_not_between("rank", 1, 3)
        .where_like("email", "%@example.com")
        .where_raw("LENGTH(name) > ?", [SqlValue::Int(3)])
        .or_where_raw("is_root = 1", [])
        .build()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT * FROM `users` WHERE `status` = ? AND `age` >= ? AND `role` IN (?, ?) AND 1 = 1 \
         AND `deleted_at` IS NULL OR `verified_at` IS NOT NULL AND `score` BETWEEN ? AND ? \
         AND `rank` NOT BETWEEN ? AND ? AND `email` LIKE ? and LENGTH(name) > ? or is_root = 1"
    );
    assert_eq!(
        bindings,
        vec![
            text("active"),
            SqlValue::Int(18),
            text("admin"),
            text("editor"),
            SqlValue::Int(10),
            SqlValue::Int(20),
            SqlValue::Int(1),
            SqlValue::Int(3),
            text("%@example.com"),
            SqlValue::Int(3),
        ]
    );
}

#[test]
fn exists_and_quantified_conditions() {
    let (db, _) = setup();
    let (sql, bindings) = db
        .table("users")
        .where_exists(sub(|q| {
            q.from("posts")
                .select_raw("1")
                .where_raw("posts.user_id = users.id", [])
        }))
        .where_not_exists(sub(|q| q.from("bans").where_eq("kind", "hard")))
        .where_any("score", ">", sub(|q| q.from("levels").select(["min"])))
        .or_where_all("score", "<", sub(|q| q.from("caps").select(["max"])))
        .build()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT * FROM `users` WHERE EXISTS (SELECT 1 FROM `posts` WHERE posts.user_id = users.id) \
         AND NOT EXISTS (SELECT * FROM `bans` WHERE `kind` = ?) \
         AND `score` > ANY (SELECT `min` FROM `levels`) OR `score` < ALL (SELECT `max` FROM `caps`)"
    );
    assert_eq!(bindings, vec![text("hard")]);
}

#[test]
fn joins_groups_havings_orders() {
    let (db, _) = setup();
    let (sql, bindings) = db
        .table("users")
        .select(["users.id"])
        .select_raw("COUNT(posts.id) AS posts")
        .left_join("posts", "posts.user_id", "=", "users.id")
        .join_on("teams", |j| {
            j.on("teams.id", "=", "users.team_id")
                .where_eq("teams.kind", "core")
        })
        .where_eq("users.active", 1)
        .group_by("users.id")
        .having_cmp("posts", ">", 5)
        .or_having_raw("MAX(posts.id) > ?", [SqlValue::Int(100)])
        .order_by("posts", Direction::Desc)
        .order_by_asc(["users.id"])
        .limit(10)
        .offset(20)
        .build()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT `users`.`id`, COUNT(posts.id) AS posts FROM `users` \
         LEFT JOIN `posts` ON posts.user_id = users.id \
         INNER JOIN `teams` ON `teams`.`id` = `users`.`team_id` AND `teams`.`kind` = ? \
         WHERE `users`.`active` = ? GROUP BY `users`.`id` HAVING `posts` > ? or MAX(posts.id) > ? \
         ORDER BY `posts` DESC, `users`.`id` ASC LIMIT ? OFFSET ?"
    );
    assert_eq!(
        bindings,
        vec![
            text("core"),
            SqlValue::Int(1),
            SqlValue::Int(5),
            SqlValue::Int(100),
            SqlValue::Int(10),
            SqlValue::Int(20),
        ]
    );
}

#[test]
fn join_sub_bindings_come_before_where() {
    let (db, _) = setup();
    let latest = db
        .table("posts")
        .select(["user_id"])
        .select_raw("MAX(created_at) AS last_post")
        .where_eq("published", true)
        .group_by("user_id");
    let (sql, bindings) = db
        .table("users")
        .join_sub(latest, "latest", "latest.user_id", "=", "users.id")
        .where_eq("users.active", 1)
        .build()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT * FROM `users` INNER JOIN (SELECT `user_id`, MAX(created_at) AS last_post FROM `posts` \
         WHERE `published` = ? GROUP BY `user_id`) AS `latest` ON latest.user_id = users.id \
         WHERE `users`.`active` = ?"
    );
    assert_eq!(bindings, vec![SqlValue::Bool(true), SqlValue::Int(1)]);
}

#[test]
fn full_outer_join_sub_with_having_batches() {
    let (db, _) = setup();
    let (sql, bindings) = db
        .table("users")
        .full_outer_join_sub_on(
            sub(|q| q.from("posts").select(["user_id"]).where_eq("draft", false)),
            "p",
            |j| j.on("p.user_id", "=", "users.id").where_eq("p.user_id", 3),
        )
        .group_by("users.id")
        .having_many([("users.id", 1)])
        .or_having_many([("users.id", ">", 10)])
        .build()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT * FROM `users` FULL OUTER JOIN (SELECT `user_id` FROM `posts` WHERE `draft` = ?) AS `p` \
         ON `p`.`user_id` = `users`.`id` AND `p`.`user_id` = ? \
         GROUP BY `users`.`id` HAVING `users`.`id` = ? OR `users`.`id` > ?"
    );
    assert_eq!(
        bindings,
        vec![
            SqlValue::Bool(false),
            SqlValue::Int(3),
            SqlValue::Int(1),
            SqlValue::Int(10)
        ]
    );
}

#[test]
fn unions_and_locks() {
    let (db, _) = setup();
    let (sql, bindings) = db
        .table("a")
        .where_eq("x", 1)
        .union(sub(|q| q.from("b").where_eq("y", 2)))
        .union_all(db.table("c"))
        .build()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT * FROM `a` WHERE `x` = ? UNION SELECT * FROM `b` WHERE `y` = ? UNION ALL SELECT * FROM `c`"
    );
    assert_eq!(bindings, vec![SqlValue::Int(1), SqlValue::Int(2)]);

    let sql = db.table("a").where_eq("id", 1).lock_for_update().to_sql();
    assert_eq!(sql, "SELECT * FROM `a` WHERE `id` = ? FOR UPDATE");
    let sql = db.table("a").shared_lock().to_sql();
    assert_eq!(sql, "SELECT * FROM `a` LOCK IN SHARE MODE");
}

#[test]
fn count_wraps_whole_select() {
    let (db, _) = setup();
    let (sql, bindings) = db
        .table("users")
        .where_eq("active", true)
        .to_count_sql()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT COUNT(*) AS `aggregate` FROM (SELECT * FROM `users` WHERE `active` = ?) AS `aggregate_table`"
    );
    assert_eq!(bindings, vec![SqlValue::Bool(true)]);
}

#[test]
fn update_with_join_places_join_before_set() {
    let (db, _) = setup();
    let (sql, bindings) = db
        .table("t")
        .join("u", "u.id", "=", "t.u_id")
        .where_eq("u.flag", 1)
        .to_update_sql(Record::from([("col", 1)]))
        .unwrap();
    assert_eq!(
        sql,
        "UPDATE `t` INNER JOIN `u` ON u.id = t.u_id SET `col` = ? WHERE `u`.`flag` = ?"
    );
    assert_eq!(bindings, vec![SqlValue::Int(1), SqlValue::Int(1)]);
}

#[test]
fn insert_forms() {
    let (db, _) = setup();
    let t = db.table("t");
    let (sql, bindings) = t.to_insert_sql(vec![Record::from([("a", 1)])]).unwrap();
    assert_eq!(sql, "INSERT INTO `t` (`a`) VALUES (?)");
    assert_eq!(bindings, vec![SqlValue::Int(1)]);

    let (sql, bindings) = t
        .to_insert_sql(vec![Record::from([("a", 1)]), Record::from([("a", 2)])])
        .unwrap();
    assert_eq!(sql, "INSERT INTO `t` (`a`) VALUES (?), (?)");
    assert_eq!(bindings, vec![SqlValue::Int(1), SqlValue::Int(2)]);

    let (sql, bindings) = t.to_insert_sql(Vec::new()).unwrap();
    assert_eq!(sql, "INSERT INTO `t` DEFAULT VALUES");
    assert!(bindings.is_empty());
}

#[test]
fn raw_expressions_are_never_quoted() {
    let (db, _) = setup();
    let (sql, bindings) = db
        .query()
        .from_expr(raw("users u"))
        .select_raw(Expression::with_binding("IF(u.score > ?, 1, 0) AS hot", 50))
        .where_like(raw("LOWER(u.name)"), "a%")
        .order_by_raw("FIELD(u.role, ?, ?)", ["admin".to_sql_value(), "user".to_sql_value()])
        .build()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT IF(u.score > ?, 1, 0) AS hot FROM users u WHERE LOWER(u.name) LIKE ? \
         ORDER BY FIELD(u.role, ?, ?)"
    );
    assert_eq!(
        bindings,
        vec![SqlValue::Int(50), text("a%"), text("admin"), text("user")]
    );
}

#[test]
fn paging_bindings() {
    let (db, _) = setup();
    let (sql, bindings) = db.table("t").for_page(1, 10).build().unwrap();
    assert_eq!(sql, "SELECT * FROM `t` LIMIT ? OFFSET ?");
    assert_eq!(bindings, vec![SqlValue::Int(10), SqlValue::Int(0)]);

    let (sql, bindings) = db.table("t").limit_range(5, 10).build().unwrap();
    assert_eq!(sql, "SELECT * FROM `t` LIMIT ?, ?");
    assert_eq!(bindings, vec![SqlValue::Int(5), SqlValue::Int(10)]);
}

#[test]
fn errors_surface_at_build() {
    let (db, _) = setup();
    let err = db
        .table("t")
        .where_cmp("a", ">", SqlValue::Null)
        .build()
        .unwrap_err();
    assert_eq!(
        err.as_build(),
        Some(&BuildError::IllegalOperatorAndValue {
            operator: String::from(">")
        })
    );

    let err = db.table("t").where_cmp("a", "LIKEISH", 1).build().unwrap_err();
    assert!(matches!(err.as_build(), Some(BuildError::InvalidOperator(_))));

    let err = db.table("t").where_in_sub("a", "").build().unwrap_err();
    assert!(matches!(err.as_build(), Some(BuildError::InvalidSubquery(_))));
}

#[test]
fn clause_state_is_inspectable() {
    let (db, _) = setup();
    let b = db.table("t").where_eq("a", 1).where_raw("b = 2", []);
    let wheres = b.query().clause(Clause::Wheres);
    assert_eq!(
        wheres.sql().collect::<Vec<_>>(),
        vec!["AND `a` = ?", "and b = 2"]
    );
    assert_eq!(wheres.bindings, vec![SqlValue::Int(1)]);
}
