//! Terminal copy for the chat loop, in the two supported languages.

pub struct Strings {
    pub welcome: &'static str,
    pub help: &'static str,
    pub status_online: &'static str,
    pub status_offline: &'static str,
    pub cleared: &'static str,
    pub busy: &'static str,
    switched_prefix: &'static str,
    you: &'static str,
}

const ZH: Strings = Strings {
    welcome: "🌌 欢迎使用 NewHorizon

输入 /persona <id> 切换角色：

• nova    你的全能AI伙伴
• byte    全栈开发专家
• muse    灵感创作伙伴
• oracle  战略决策顾问

所有处理均通过本地Ollama完成，你的数据完全私有。

💡 提示：按 ⏎ 发送消息，输入 /clear 清空历史，/help 查看命令",
    help: "命令：/clear 清空历史 | /persona <id> 切换角色 | /personas 角色列表 | /status 连接状态 | /quit 退出",
    status_online: "● 在线（Ollama已连接）",
    status_offline: "● 离线模式（Ollama未连接）",
    cleared: "🧹 对话历史已清空",
    busy: "⏳ 正在等待回复，请稍候",
    switched_prefix: "已切换至: ",
    you: "你",
};

const EN: Strings = Strings {
    welcome: "🌌 Welcome to NewHorizon

Type /persona <id> to pick who you talk to:

• nova    Your versatile AI companion
• byte    Full-stack development expert
• muse    Creative writing partner
• oracle  Strategic decision advisor

All processing happens locally via Ollama, so your data stays private.

💡 Tip: Press ⏎ to send, type /clear to reset history, /help for commands",
    help: "Commands: /clear reset history | /persona <id> switch persona | /personas list personas | /status connection | /quit exit",
    status_online: "● Online (Ollama connected)",
    status_offline: "● Offline (Ollama not connected)",
    cleared: "🧹 Conversation history cleared",
    busy: "⏳ Still waiting for the current reply",
    switched_prefix: "Switched to: ",
    you: "You",
};

impl Strings {
    /// Chinese unless English is asked for, matching the persona labels' default.
    pub fn for_language(language: &str) -> &'static Strings {
        match language {
            "en" => &EN,
            _ => &ZH,
        }
    }

    pub fn status(&self, online: bool) -> &'static str {
        if online {
            self.status_online
        } else {
            self.status_offline
        }
    }

    pub fn switched(&self, name: &str) -> String {
        format!("{}{name}", self.switched_prefix)
    }

    pub fn you(&self) -> &'static str {
        self.you
    }
}
