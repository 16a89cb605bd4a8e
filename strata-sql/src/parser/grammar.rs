//! Pest grammar parser for MySQL scripts.

use pest_derive::Parser;

/// The MySQL script and DDL parser.
#[derive(Parser)]
#[grammar = "parser/mysql.pest"]
pub struct MysqlParser;

#[cfg(test)]
mod tests {
    use super::*;
    use pest::Parser;

    #[test]
    fn test_parse_identifier() {
        assert!(MysqlParser::parse(Rule::ident, "users").is_ok());
        assert!(MysqlParser::parse(Rule::ident, "`odd name`").is_ok());
    }

    #[test]
    fn test_parse_data_type() {
        let result = MysqlParser::parse(Rule::data_type, "bigint(20) unsigned zerofill");
        assert!(result.is_ok());

        let result = MysqlParser::parse(
            Rule::data_type,
            "varchar(64) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin",
        );
        assert!(result.is_ok());

        let result = MysqlParser::parse(Rule::data_type, "enum('a','b')");
        assert!(result.is_ok());
    }

    #[test]
    fn test_parse_column_def() {
        let input = "`updated_at` datetime NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP COMMENT 'touched'";
        let result = MysqlParser::parse(Rule::column_def, input);
        assert!(result.is_ok(), "Failed to parse column: {:?}", result.err());
    }

    #[test]
    fn test_parse_table_constraint() {
        for input in [
            "PRIMARY KEY (`id`)",
            "UNIQUE KEY `uk_name` (`name`)",
            "KEY `idx_org` (`org_id`, `created_at` DESC) USING BTREE",
            "CONSTRAINT `fk_org` FOREIGN KEY (`org_id`) REFERENCES `orgs` (`id`) ON DELETE CASCADE",
            "CONSTRAINT `chk_age` CHECK ((`age` > 0))",
            "FULLTEXT KEY `ft_body` (`body`)",
        ] {
            let result = MysqlParser::parse(Rule::table_constraint, input);
            assert!(result.is_ok(), "Failed to parse {input}: {:?}", result.err());
        }
    }

    #[test]
    fn test_parse_script_with_comments() {
        let input = "/* header; */ SELECT 1; -- trailing; comment\nSELECT ';'";
        let result = MysqlParser::parse(Rule::script, input);
        assert!(result.is_ok(), "Failed to split script: {:?}", result.err());
    }

    #[test]
    fn test_unterminated_string_fails_split() {
        assert!(MysqlParser::parse(Rule::script, "SELECT 'oops").is_err());
    }

    #[test]
    fn test_parse_alter_partition() {
        let result = MysqlParser::parse(Rule::alter_table, "ALTER TABLE t DROP PARTITION p0");
        assert!(result.is_ok(), "{:?}", result.err());
    }
}
